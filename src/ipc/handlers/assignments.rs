use crate::error::StoreError;
use crate::ipc::helpers::{
    get_optional_date, get_optional_str, get_required_str, respond, to_json, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::NewAssignment;
use crate::store::Store;
use serde_json::json;

fn assignments_list(store: &Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "tutorial")?;
    let Some(tutorial) = store.tutorial_by_name(&name) else {
        return Err(StoreError::TutorialNotFound(name).into());
    };
    to_json(&store.assignments_of(tutorial)).map(|v| json!({ "assignments": v }))
}

fn assignments_create(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let tutorial = get_required_str(params, "tutorial")?;
    let new = NewAssignment {
        name: get_required_str(params, "name")?,
        due: get_optional_date(params, "due")?,
    };
    let assignment = store.add_assignment(&tutorial, new)?;
    to_json(&assignment).map(|v| json!({ "assignment": v }))
}

fn assignments_update(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let tutorial = get_required_str(params, "tutorial")?;
    let name = get_required_str(params, "assignment")?;
    let Some(current) = store
        .tutorial_by_name(&tutorial)
        .and_then(|t| store.assignment_in(t.id, &name))
    else {
        return Err(HandlerErr {
            code: "not_found",
            message: format!("assignment {} not found in tutorial {}", name, tutorial),
            details: None,
        });
    };

    let due = if params.get("due").is_some() {
        get_optional_date(params, "due")?
    } else {
        current.due
    };
    let edit = NewAssignment {
        name: get_optional_str(params, "name").unwrap_or_else(|| current.name.clone()),
        due,
    };
    let assignment = store.set_assignment(&tutorial, &name, edit)?;
    to_json(&assignment).map(|v| json!({ "assignment": v }))
}

fn assignments_delete(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let tutorial = get_required_str(params, "tutorial")?;
    let name = get_required_str(params, "assignment")?;
    let assignment = store.remove_assignment(&tutorial, &name)?;
    Ok(json!({ "assignmentId": assignment.id, "name": assignment.name }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let store = &mut state.store;
    let result = match req.method.as_str() {
        "assignments.list" => assignments_list(store, &req.params),
        "assignments.create" => assignments_create(store, &req.params),
        "assignments.update" => assignments_update(store, &req.params),
        "assignments.delete" => assignments_delete(store, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
