use crate::ipc::helpers::{get_required_str, resolve_student, respond, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::Store;
use crate::views;
use serde_json::json;

fn attendance_get(store: &Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let tutorial = get_required_str(params, "tutorial")?;
    to_json(&views::attendance_sheet(store, &tutorial)?)
}

// Weeks are 1-based on the wire.
fn parse_week(params: &serde_json::Value, weeks: usize) -> Result<usize, HandlerErr> {
    let week = params
        .get("week")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| HandlerErr::bad_params("missing week"))? as usize;
    if week == 0 || week > weeks {
        return Err(HandlerErr {
            code: "bad_params",
            message: format!("week must be between 1 and {}", weeks),
            details: Some(json!({ "week": week })),
        });
    }
    Ok(week - 1)
}

fn attendance_set(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let tutorial = get_required_str(params, "tutorial")?;
    let student = resolve_student(store, params)?;
    let week = parse_week(params, store.weeks())?;
    let present = params
        .get("present")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| HandlerErr::bad_params("present must be a boolean"))?;

    let record = store.set_attendance(&tutorial, student, week, present)?;
    Ok(json!({
        "tutorial": tutorial,
        "studentId": record.student,
        "weeks": record.weeks,
        "present": record.present_count(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let store = &mut state.store;
    let result = match req.method.as_str() {
        "attendance.get" => attendance_get(store, &req.params),
        "attendance.set" => attendance_set(store, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
