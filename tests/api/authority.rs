use super::new_sentinel;
use sentinel_guard::{
    authority,
    base::{call_context, BlockType},
};
use std::sync::Arc;

#[test]
fn white_list() {
    let sentinel = new_sentinel();
    sentinel.authority().load_rules(vec![Arc::new(authority::Rule {
        resource: "authority_test".into(),
        limit_app: "app-a, app-b".into(),
        strategy: authority::AuthorityStrategy::White,
        ..Default::default()
    })]);

    call_context::enter("authority", "app-b");
    sentinel
        .entry_builder("authority_test")
        .build()
        .unwrap()
        .exit();
    call_context::exit();

    call_context::enter("authority", "app-c");
    let err = sentinel
        .entry_builder("authority_test")
        .build()
        .unwrap_err();
    assert_eq!(err.block_type(), BlockType::Authority);
    call_context::exit();

    // unknown origin passes
    sentinel
        .entry_builder("authority_test")
        .build()
        .unwrap()
        .exit();
}
