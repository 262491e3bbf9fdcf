use super::new_sentinel;
use sentinel_guard::utils::sleep_for_ms;
use sentinel_guard::{
    datasource::{
        rule_json_array_encoder, rule_json_array_parser, FileRefreshableDataSource,
        FileWritableDataSource, ReadableDataSource, WritableDataSourceRegistry,
    },
    flow,
    transport::{CommandHandler, CommandRequest, CommandResponse, ModifyRulesCommandHandler},
};
use std::fs;
use std::sync::Arc;

#[test]
fn file_rules_round_trip() {
    let sentinel = new_sentinel();
    let path = std::env::temp_dir().join(format!("sentinel-flow-{}.json", uuid::Uuid::new_v4()));
    fs::write(&path, r#"[{"resource":"file_ds_test","threshold":5.0}]"#).unwrap();

    let readable = FileRefreshableDataSource::<Vec<Arc<flow::Rule>>>::with_refresh_ms(
        &path,
        rule_json_array_parser,
        20,
    )
    .unwrap();
    sentinel.flow().register_property(readable.property());
    assert_eq!(sentinel.flow().get_rules_of_resource("file_ds_test")[0].threshold, 5.0);

    let registry = Arc::new(WritableDataSourceRegistry::new());
    registry.register_flow_data_source(Arc::new(FileWritableDataSource::new(
        &path,
        rule_json_array_encoder,
    )));
    let handler = ModifyRulesCommandHandler::new(&sentinel, registry);
    let res = handler.handle(
        &CommandRequest::new()
            .with_param("type", "flow")
            .with_param("data", r#"[{"resource":"file_ds_test","threshold":20.0},{"resource":"other","threshold":1.0}]"#),
    );
    assert_eq!(res, CommandResponse::Success("success".into()));
    assert_eq!(sentinel.flow().get_rules().len(), 2);

    // the persisted rules are read back without changing the loaded ones
    sleep_for_ms(200);
    let persisted = readable.property().value();
    assert_eq!(persisted.len(), 2);
    assert_eq!(persisted[0].threshold, 20.0);
    assert_eq!(sentinel.flow().get_rules_of_resource("file_ds_test")[0].threshold, 20.0);

    readable.close().unwrap();
    fs::remove_file(&path).unwrap();
}
