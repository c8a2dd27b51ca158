use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{respond, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::snapshot::{self, Snapshot};
use serde_json::json;
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "weeks": state.config.weeks,
            "counts": {
                "tutorials": state.store.tutorials().len(),
                "students": state.store.students().len(),
                "assignments": state.store.assignments().len(),
                "attendance": state.store.attendances().len(),
                "submissions": state.store.submissions().len(),
            }
        }),
    )
}

fn handle_store_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.store.clear();
    ok(&req.id, json!({ "cleared": true }))
}

fn handle_store_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let snap = snapshot::capture(&state.store);
    respond(&req.id, to_json(&snap).map(|v| json!({ "snapshot": v })))
}

fn store_import(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let Some(raw) = params.get("snapshot") else {
        return Err(HandlerErr::bad_params("missing snapshot"));
    };
    let snap: Snapshot = serde_json::from_value(raw.clone()).map_err(|e| HandlerErr {
        code: "bad_params",
        message: format!("invalid snapshot: {e}"),
        details: None,
    })?;

    // The live store is only swapped once the replay fully succeeds.
    let restored = snapshot::restore(&snap, state.config.weeks).map_err(|e| HandlerErr {
        code: "import_failed",
        message: e.to_string(),
        details: None,
    })?;
    state.store = restored;
    info!(
        tutorials = state.store.tutorials().len(),
        students = state.store.students().len(),
        "store imported"
    );
    Ok(json!({
        "tutorials": state.store.tutorials().len(),
        "students": state.store.students().len(),
        "attendance": state.store.attendances().len(),
        "submissions": state.store.submissions().len(),
    }))
}

fn handle_store_verify(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.store.verify() {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "store.clear" => Some(handle_store_clear(state, req)),
        "store.export" => Some(handle_store_export(state, req)),
        "store.import" => Some(respond(&req.id, store_import(state, &req.params))),
        "store.verify" => Some(handle_store_verify(state, req)),
        _ => None,
    }
}
