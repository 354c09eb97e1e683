//! Scenario 3: Principal Deletion
//!
//! A principal that still owns documents cannot be deleted, whoever asks:
//!
//! Sub-case A: admin deletes an author who owns a document → blocked
//! Sub-case B: the document is handed over, then the deletion succeeds
//! Sub-case C: a principal owning nothing is deleted straight away

use custos_contracts::{
    decision::DecisionKind,
    error::CustosResult,
    principal::PrincipalId,
};

use crate::host::CmsHost;
use crate::mock_data::{ALICE, BOB, ROOT};
use crate::scenarios::{report, saved_id};

/// Run Scenario 3: Principal Deletion.
pub fn run_scenario() -> CustosResult<()> {
    println!("=== Scenario 3: Principal Deletion ===");
    println!();

    let host = CmsHost::new()?;
    let root = host.session(ROOT)?;
    let alice_id = PrincipalId::new(ALICE);

    let alice = host.session(ALICE)?;
    let doc = host.write_doc(&alice, "Alice's handbook", "")?;
    let doc_id = saved_id(&doc)?;
    println!("  alice owns doc '{}'", doc_id);
    println!();

    // ── Sub-case A: blocked by ownership ──────────────────────────────────────

    {
        println!("  Sub-case A: root deletes alice while she owns a document");
        report("delete principal alice", host.principals().delete(&root, &alice_id))?;
        println!("  alice still present:    {}", host.principals().contains(&alice_id));
        println!();
    }

    // ── Sub-case B: hand over, then delete ────────────────────────────────────

    {
        println!("  Sub-case B: root takes over the document, then deletes alice");
        if let Some(mut doc) = host.entities().load("doc", &doc_id) {
            doc.set("author", ROOT);
            report("root reassigns the doc", host.entities().save(&root, &mut doc))?;
        }
        report("delete principal alice", host.principals().delete(&root, &alice_id))?;
        println!("  alice still present:    {}", host.principals().contains(&alice_id));
        println!();
    }

    // ── Sub-case C: nothing owned ─────────────────────────────────────────────

    {
        println!("  Sub-case C: bob owns nothing");
        report("delete principal bob", host.principals().delete(&root, &PrincipalId::new(BOB)))?;
        println!();
    }

    let decisions = host.audit().records_of_kind(DecisionKind::DeletePrincipal);
    println!(
        "  Principal decisions:    {} ({} denied)",
        decisions.len(),
        decisions.iter().filter(|r| !r.allowed).count()
    );
    println!("  Audit chain integrity:  {}", host.audit_summary());
    println!("  Scenario 3 complete.");
    println!();

    Ok(())
}
