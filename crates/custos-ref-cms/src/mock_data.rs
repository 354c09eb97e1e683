//! Fixture principals and messages for the reference CMS.
//!
//! All data is hardcoded and fictional.

use custos_contracts::{
    permission::PermissionKey,
    principal::{Principal, Role},
};
use custos_memory::StaticMessageResolver;

pub const ROOT: &str = "a1";
pub const ALICE: &str = "u1";
pub const BOB: &str = "u2";
pub const EDITOR: &str = "e1";
pub const DEV: &str = "d1";

fn global(namespace: &str, action: &str, model: &str) -> String {
    PermissionKey::global(namespace, action, model).to_string()
}

fn personal(namespace: &str, action: &str, model: &str) -> String {
    PermissionKey::personal(namespace, action, model).to_string()
}

/// The CMS staff, in insertion order. `root` comes first and is therefore
/// the fallback owner.
///
/// - `root`   admin
/// - `alice`  author: create, plus view/modify/delete of her own documents
/// - `bob`    contributor: create only
/// - `eve`    editor: view, modify, and delete any document
/// - `dev`    developer
pub fn principals(namespace: &str) -> Vec<Principal> {
    let alice = ["view", "modify", "delete"].iter().fold(
        Principal::new(ALICE, "alice", Role::Regular).with_permission(global(namespace, "create", "doc")),
        |p, action| p.with_permission(personal(namespace, action, "doc")),
    );

    let editor = ["view", "modify", "delete"].iter().fold(
        Principal::new(EDITOR, "eve", Role::Regular),
        |p, action| p.with_permission(global(namespace, action, "doc")),
    );

    vec![
        Principal::new(ROOT, "root", Role::Admin),
        alice,
        Principal::new(BOB, "bob", Role::Regular).with_permission(global(namespace, "create", "doc")),
        editor,
        Principal::new(DEV, "dev", Role::Dev),
    ]
}

/// Localization packages the CMS ships. Keys without a message resolve to
/// themselves.
pub fn message_catalogue(namespace: &str) -> StaticMessageResolver {
    let doc = |action: &str| PermissionKey::from_declared(namespace, action, "doc").message_id();

    StaticMessageResolver::new()
        .with_message("plugins.docs", doc("view"), "View any document")
        .with_message("plugins.docs", doc("view_own"), "View own documents")
        .with_message("plugins.docs", doc("create"), "Create documents")
        .with_message("plugins.docs", doc("modify"), "Edit any document")
        .with_message("plugins.docs", doc("modify_own"), "Edit own documents")
        .with_message("plugins.docs", doc("delete"), "Delete any document")
        .with_message("plugins.docs", doc("delete_own"), "Delete own documents")
        .with_package("plugins.taxonomy")
}
