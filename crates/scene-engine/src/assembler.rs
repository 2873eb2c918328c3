//! Timeline and scene assembly
//!
//! Turns track definitions into absolute-time scene tracks, continuing each
//! object's timeline from its cursor, and splits finished scenes into one
//! partition per batch key.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::context::{SceneOutput, SceneSettings};
use crate::metadata::CursorMap;
use crate::overrides::apply_batch_key;
use crate::scene::{AnimationTrack, BatchKey, SceneAnimationTrack, SceneObject};
use crate::types::NodeId;

/// Tracks placed on one object's timeline
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedTracks {
    pub tracks: Vec<SceneAnimationTrack>,
    /// Time at which the object's timeline is free again
    pub cursor: f64,
}

/// Place `tracks` on the object's timeline
///
/// The baseline is the later of the object's appearance time and its
/// cursor. Every track starts at `baseline + startTime`; the new cursor is
/// the latest track end, or the baseline when there are no tracks.
pub fn place_tracks(
    node_id: &str,
    object: &SceneObject,
    tracks: &[AnimationTrack],
    cursors: &CursorMap,
) -> PlacedTracks {
    let appearance = object.appearance_time.unwrap_or(0.0);
    let baseline = appearance.max(cursors.get(&object.id));

    let placed: Vec<SceneAnimationTrack> = tracks
        .iter()
        .map(|track| SceneAnimationTrack {
            id: format!("{}-{}-{}", node_id, track.id, object.id),
            object_id: object.id.clone(),
            start_time: baseline + track.start_time,
            duration: track.duration,
            easing: track.easing,
            properties: track.properties.clone(),
        })
        .collect();

    let cursor = placed
        .iter()
        .map(SceneAnimationTrack::end_time)
        .fold(baseline, f64::max);

    PlacedTracks {
        tracks: placed,
        cursor,
    }
}

/// A scene restricted to one batch key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePartition {
    pub scene_id: NodeId,
    /// `None` when the scene has no batched objects
    pub batch_key: Option<BatchKey>,
    pub settings: SceneSettings,
    pub objects: Vec<SceneObject>,
    pub animations: Vec<SceneAnimationTrack>,
}

/// Distinct batch keys of the scene's batched objects, in first-seen order
pub fn batch_keys(objects: &[SceneObject]) -> Vec<BatchKey> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut keys = Vec::new();
    for object in objects.iter().filter(|o| o.is_batched()) {
        for key in &object.batch_keys {
            if seen.insert(key.as_str()) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

/// Split a scene into partitions
///
/// Each partition holds the unbatched objects plus the batched objects
/// carrying its key, with batch overrides for that key applied and ids
/// namespaced as `{id}{separator}{key}`. A scene without batched objects
/// yields a single partition with no key and the original ids.
pub fn partition_scene(scene: &SceneOutput, config: &EngineConfig) -> Vec<ScenePartition> {
    let keys = batch_keys(&scene.objects);

    if keys.is_empty() {
        return vec![ScenePartition {
            scene_id: scene.scene_id.clone(),
            batch_key: None,
            settings: scene.settings.clone(),
            objects: scene.objects.clone(),
            animations: scene.animations.clone(),
        }];
    }

    keys.into_iter()
        .map(|key| {
            let mut included: HashSet<&str> = HashSet::new();
            let mut objects = Vec::new();

            for object in &scene.objects {
                if object.is_batched() && !object.batch_keys.contains(&key) {
                    continue;
                }
                included.insert(object.id.as_str());

                let mut partitioned = object.clone();
                apply_batch_key(&mut partitioned, Some(&key));
                partitioned.batch_overrides.clear();
                partitioned.id = config.partition_id(&object.id, &key);
                objects.push(partitioned);
            }

            let animations = scene
                .animations
                .iter()
                .filter(|t| included.contains(t.object_id.as_str()))
                .map(|t| SceneAnimationTrack {
                    id: config.partition_id(&t.id, &key),
                    object_id: config.partition_id(&t.object_id, &key),
                    ..t.clone()
                })
                .collect();

            log::debug!(
                "Scene '{}' partition '{}': {} objects",
                scene.scene_id,
                key,
                objects.len()
            );

            ScenePartition {
                scene_id: scene.scene_id.clone(),
                batch_key: Some(key),
                settings: scene.settings.clone(),
                objects,
                animations,
            }
        })
        .collect()
}
