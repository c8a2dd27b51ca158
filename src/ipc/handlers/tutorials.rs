use crate::ipc::helpers::{get_required_str, resolve_student, respond, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::Store;
use crate::views;
use serde_json::json;

fn tutorials_list(store: &Store) -> Result<serde_json::Value, HandlerErr> {
    let tutorials: Vec<serde_json::Value> = store
        .tutorials()
        .iter()
        .map(|t| {
            json!({
                "id": t.id,
                "name": t.name,
                "studentCount": store.students().iter().filter(|s| s.in_tutorial(t.id)).count(),
                "assignmentCount": t.assignments.len(),
            })
        })
        .collect();
    Ok(json!({ "tutorials": tutorials }))
}

fn tutorials_create(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let tutorial = store.add_tutorial(&name)?;
    Ok(json!({ "tutorialId": tutorial.id, "name": tutorial.name }))
}

fn tutorials_rename(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "tutorial")?;
    let new_name = get_required_str(params, "name")?;
    let tutorial = store.rename_tutorial(&name, &new_name)?;
    Ok(json!({ "tutorialId": tutorial.id, "name": tutorial.name }))
}

fn tutorials_delete(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "tutorial")?;
    let tutorial = store.remove_tutorial(&name)?;
    Ok(json!({ "tutorialId": tutorial.id, "name": tutorial.name }))
}

fn tutorials_roster(store: &Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    match params.get("tutorial").and_then(|v| v.as_str()) {
        Some(name) => to_json(&views::tutorial_roster(store, name.trim())?),
        None => to_json(&views::rosters(store)).map(|v| json!({ "rosters": v })),
    }
}

fn tutorials_enroll(store: &mut Store, params: &serde_json::Value, enroll: bool) -> Result<serde_json::Value, HandlerErr> {
    let tutorial = get_required_str(params, "tutorial")?;
    let student = resolve_student(store, params)?;
    let updated = if enroll {
        store.enroll_student(&tutorial, student)?
    } else {
        store.unenroll_student(&tutorial, student)?
    };
    to_json(&views::student_view(store, &updated)).map(|v| json!({ "student": v }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let store = &mut state.store;
    let result = match req.method.as_str() {
        "tutorials.list" => tutorials_list(store),
        "tutorials.create" => tutorials_create(store, &req.params),
        "tutorials.rename" => tutorials_rename(store, &req.params),
        "tutorials.delete" => tutorials_delete(store, &req.params),
        "tutorials.roster" => tutorials_roster(store, &req.params),
        "tutorials.enroll" => tutorials_enroll(store, &req.params, true),
        "tutorials.unenroll" => tutorials_enroll(store, &req.params, false),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
