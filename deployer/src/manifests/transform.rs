//! Manifest rewriting for stable and canary deploys

use serde_json::{json, Map, Value};

use crate::models::image::ImageReference;
use crate::models::manifest::ManifestDocument;

pub const CANARY_SUFFIX: &str = "-canary";
pub const TRACK_CANARY: &str = "canary";
pub const TRACK_STABLE: &str = "stable";

/// Rewrite a copy of `document` for a deploy of `tag`.
///
/// Untagged container images of workloads get `:<tag>`. Deployments and
/// StatefulSets are labelled with their track; as canaries they are renamed
/// with a `-canary` suffix, pinned to one replica and see `TRACK=canary` in
/// their environment. Paths missing from the document are left alone.
///
/// Applying this twice to a canary suffixes the name twice.
pub fn transform(document: &ManifestDocument, tag: &str, canary: bool) -> ManifestDocument {
    let mut result = document.clone();

    inject_tag(&mut result, tag);

    if !result.is_canary_eligible() {
        return result;
    }

    if canary {
        rename_canary(&mut result);
    }
    label_track(&mut result, tag, canary);
    if canary {
        pin_replicas(&mut result);
        inject_track_env(&mut result);
    }

    result
}

fn inject_tag(document: &mut ManifestDocument, tag: &str) {
    let Some(containers) = document.containers_mut() else {
        return;
    };
    for container in containers {
        let Some(image) = container.get("image").and_then(Value::as_str) else {
            continue;
        };
        let reference = ImageReference::parse(image);
        if !reference.has_explicit_tag() {
            container["image"] = Value::String(reference.with_tag(tag).to_string());
        }
    }
}

fn rename_canary(document: &mut ManifestDocument) {
    if let Some(Value::String(name)) = document.value_mut().pointer_mut("/metadata/name") {
        name.push_str(CANARY_SUFFIX);
    }
}

fn label_track(document: &mut ManifestDocument, tag: &str, canary: bool) {
    let Some(template) = document
        .value_mut()
        .pointer_mut("/spec/template")
        .and_then(Value::as_object_mut)
    else {
        return;
    };
    let Some(labels) = child_object(template, "metadata").and_then(|m| child_object(m, "labels"))
    else {
        return;
    };

    let track = if canary { TRACK_CANARY } else { TRACK_STABLE };
    labels.insert("track".to_string(), Value::String(track.to_string()));
    labels.insert("tag".to_string(), Value::String(tag.to_string()));
}

fn pin_replicas(document: &mut ManifestDocument) {
    if let Some(spec) = document.value_mut().get_mut("spec").and_then(Value::as_object_mut) {
        spec.insert("replicas".to_string(), json!(1));
    }
}

fn inject_track_env(document: &mut ManifestDocument) {
    let Some(containers) = document.containers_mut() else {
        return;
    };
    for container in containers.iter_mut().filter_map(Value::as_object_mut) {
        let env = container
            .entry("env")
            .or_insert_with(|| Value::Array(Vec::new()));
        if env.is_null() {
            *env = Value::Array(Vec::new());
        }
        if let Some(env) = env.as_array_mut() {
            env.push(json!({ "name": "TRACK", "value": TRACK_CANARY }));
        }
    }
}

/// The object under `key`, created when absent; `None` if it is not a map
fn child_object<'a>(parent: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
    let child = parent
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if child.is_null() {
        *child = Value::Object(Map::new());
    }
    child.as_object_mut()
}
