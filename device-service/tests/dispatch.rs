mod common;

use common::{Call, FakeCloud, Harness, function, remote};
use device_service::{CommandDispatcher, ServiceError};
use gateway_core::{
    cloud::{CloudDevice, CommandEndpoint, Envelope},
    model::{Command, StatusValue},
    storage::KvStore,
};
use std::sync::Arc;

fn dispatcher(h: &Harness) -> CommandDispatcher {
    CommandDispatcher::new(Arc::new(h.cloud.clone()), h.kv.clone(), h.states.clone())
}

fn command_call(device_id: &str, endpoint: CommandEndpoint, commands: Vec<Command>) -> Call {
    Call::Command { device_id: device_id.into(), endpoint, commands }
}

#[tokio::test]
async fn success_persists_state_and_evicts_detail_cache() {
    let h = Harness::new(FakeCloud::default());
    h.kv.set("cache:tuya_device:P", b"{}".to_vec()).await.unwrap();
    h.kv.set("cache:devices:u1", b"[]".to_vec()).await.unwrap();

    let ok = dispatcher(&h).send_command("tok", "P", &[Command::new("switch_1", true)]).await.unwrap();

    assert!(ok);
    let state = h.states.get_state("P").await.unwrap().unwrap();
    assert_eq!(state.last_commands, vec![Command::new("switch_1", true)]);
    assert!(h.kv.get("cache:tuya_device:P").await.unwrap().is_none());
    assert!(h.kv.get("cache:devices:u1").await.unwrap().is_some());
}

#[tokio::test]
async fn schema_mismatch_is_bad_request_without_retry() {
    let cloud = FakeCloud::default();
    cloud.reply_command(Envelope::failure(1106, "param is illegal"));
    let h = Harness::new(cloud);

    let err = dispatcher(&h).send_command("tok", "P", &[Command::new("switch_1", true)]).await.unwrap_err();

    assert!(matches!(err, ServiceError::BadRequest { code: 1106 }));
    assert_eq!(h.cloud.command_calls().len(), 1);
    assert!(h.states.get_state("P").await.unwrap().is_none());
}

#[tokio::test]
async fn naming_mismatch_retries_once_on_legacy_endpoint() {
    let cloud = FakeCloud::default();
    cloud.reply_command(Envelope::failure(2008, "command or value not support"));
    let h = Harness::new(cloud);

    let ok = dispatcher(&h).send_command("tok", "P", &[Command::new("switch_1", true)]).await.unwrap();

    assert!(ok);
    assert_eq!(
        h.cloud.command_calls(),
        vec![
            command_call("P", CommandEndpoint::Standard, vec![Command::new("switch_1", true)]),
            command_call("P", CommandEndpoint::Legacy, vec![Command::new("switch1", true)]),
        ]
    );
}

#[tokio::test]
async fn naming_mismatch_without_switch_codes_fails_without_retry() {
    let cloud = FakeCloud::default();
    cloud.reply_command(Envelope::failure(2008, "command or value not support"));
    let h = Harness::new(cloud);

    let err = dispatcher(&h).send_command("tok", "P", &[Command::new("bright_value", 10)]).await.unwrap_err();

    assert_eq!(err.to_string(), "tuya API failed: command or value not support (code: 2008)");
    assert_eq!(h.cloud.command_calls().len(), 1);
}

#[tokio::test]
async fn failed_legacy_retry_reports_original_error() {
    let cloud = FakeCloud::default();
    cloud.reply_command(Envelope::failure(2008, "command or value not support"));
    cloud.reply_command(Envelope::failure(2008, "still not supported"));
    let h = Harness::new(cloud);

    let err = dispatcher(&h).send_command("tok", "P", &[Command::new("switch_2", false)]).await.unwrap_err();

    assert!(matches!(err, ServiceError::Upstream { code: 2008, .. }));
    assert!(err.to_string().contains("command or value not support"));
    assert_eq!(h.cloud.command_calls().len(), 2);
}

#[tokio::test]
async fn generic_failure_is_upstream_error() {
    let cloud = FakeCloud::default();
    cloud.reply_command(Envelope::failure(1010, "token invalid"));
    let h = Harness::new(cloud);

    let err = dispatcher(&h).send_command("tok", "P", &[Command::new("switch_1", true)]).await.unwrap_err();

    assert!(err.to_string().contains("(code: 1010)"));
}

#[tokio::test]
async fn ir_command_uses_remote_gateway_and_persists_state() {
    let cloud = FakeCloud::default();
    cloud.set_iot_detail(remote("R", "AC", "HUB"));
    let h = Harness::new(cloud);
    h.states.save_state("R", &[Command::new("power", 1)]).await.unwrap();
    h.kv.set("cache:tuya_device:R", b"{}".to_vec()).await.unwrap();

    let ok = dispatcher(&h).send_ir_ac_command("tok", "ignored", "R", "temp", 22).await.unwrap();

    assert!(ok);
    assert_eq!(
        h.cloud.command_calls(),
        vec![Call::IrAc { infrared_id: "HUB".into(), remote_id: "R".into(), code: "temp".into(), value: 22 }]
    );
    let state = h.states.get_state("R").await.unwrap().unwrap();
    assert_eq!(state.last_commands.len(), 2);
    assert!(state.last_commands.contains(&Command::new("temp", 22)));
    assert!(h.kv.get("cache:tuya_device:R").await.unwrap().is_none());
}

#[tokio::test]
async fn ir_remote_lookup_reads_iot_core_record_only() {
    let cloud = FakeCloud::default();
    cloud.set_detail(remote("R", "AC", "OLD_HUB"));
    cloud.set_iot_detail(remote("R", "AC", "HUB"));
    let h = Harness::new(cloud);

    dispatcher(&h).send_ir_ac_command("tok", "IR", "R", "temp", 22).await.unwrap();

    assert_eq!(h.cloud.count(|c| *c == Call::IotDevice("R".into())), 1);
    assert_eq!(h.cloud.count(|c| matches!(c, Call::Device(_))), 0);
    assert_eq!(
        h.cloud.command_calls(),
        vec![Call::IrAc { infrared_id: "HUB".into(), remote_id: "R".into(), code: "temp".into(), value: 22 }]
    );
}

#[tokio::test]
async fn ir_lookup_failure_keeps_supplied_infrared_id() {
    let h = Harness::new(FakeCloud::default());

    dispatcher(&h).send_ir_ac_command("tok", "IR", "R", "mode", 1).await.unwrap();

    assert_eq!(
        h.cloud.command_calls(),
        vec![Call::IrAc { infrared_id: "IR".into(), remote_id: "R".into(), code: "mode".into(), value: 1 }]
    );
}

#[tokio::test]
async fn ir_not_supported_falls_back_to_legacy_on_remote() {
    let cloud = FakeCloud::default();
    cloud.reply_ir(Envelope::failure(30100, "infrared not supported"));
    let h = Harness::new(cloud);

    let ok = dispatcher(&h).send_ir_ac_command("tok", "IR", "R", "power", 1).await.unwrap();

    assert!(ok);
    let calls = h.cloud.command_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1],
        command_call("R", CommandEndpoint::Legacy, vec![Command::new("PowerOn", StatusValue::from("PowerOn"))])
    );
}

#[tokio::test]
async fn ir_param_error_also_falls_back() {
    let cloud = FakeCloud::default();
    cloud.reply_ir(Envelope::failure(1106, "param is illegal"));
    let h = Harness::new(cloud);

    dispatcher(&h).send_ir_ac_command("tok", "IR", "R", "temp", 25).await.unwrap();

    assert_eq!(
        h.cloud.command_calls()[1],
        command_call("R", CommandEndpoint::Legacy, vec![Command::new("T", 25)])
    );
}

#[tokio::test]
async fn custom_instruction_set_skips_ir_endpoint() {
    let cloud = FakeCloud::default();
    cloud.set_iot_detail(CloudDevice { functions: vec![function("PowerOn"), function("T")], ..remote("R", "AC", "HUB") });
    let h = Harness::new(cloud);

    dispatcher(&h).send_ir_ac_command("tok", "IR", "R", "power", 0).await.unwrap();

    assert_eq!(
        h.cloud.command_calls(),
        vec![command_call("R", CommandEndpoint::Legacy, vec![Command::new("PowerOff", StatusValue::from("PowerOff"))])]
    );
}

#[tokio::test]
async fn legacy_fallback_failure_classification() {
    let cloud = FakeCloud::default();
    cloud.reply_ir(Envelope::failure(30100, "infrared not supported"));
    cloud.reply_command(Envelope::failure(1106, "param is illegal"));
    cloud.reply_ir(Envelope::failure(30100, "infrared not supported"));
    cloud.reply_command(Envelope::failure(501, "device offline"));
    let h = Harness::new(cloud);
    let d = dispatcher(&h);

    let bad = d.send_ir_ac_command("tok", "IR", "R", "wind", 2).await.unwrap_err();
    assert!(bad.is_bad_request());

    let other = d.send_ir_ac_command("tok", "IR", "R", "wind", 2).await.unwrap_err();
    assert_eq!(other.to_string(), "tuya Legacy API failed: device offline (code: 501)");
}

#[tokio::test]
async fn other_ir_failures_are_not_retried() {
    let cloud = FakeCloud::default();
    cloud.reply_ir(Envelope::failure(1010, "token invalid"));
    let h = Harness::new(cloud);

    let err = dispatcher(&h).send_ir_ac_command("tok", "IR", "R", "temp", 20).await.unwrap_err();

    assert_eq!(err.to_string(), "tuya IR API failed: token invalid (code: 1010)");
    assert_eq!(h.cloud.command_calls().len(), 1);
    assert!(h.states.get_state("R").await.unwrap().is_none());
}
