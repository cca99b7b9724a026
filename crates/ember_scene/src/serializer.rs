//! Scene persistence.
//!
//! [`SceneSerializer`] is the collaborator the prefab system saves through.
//! [`JsonSceneSerializer`] stores a scene as a flat, pre-ordered list of
//! object records with parent indices:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "name": "Level",
//!   "objects": [
//!     { "name": "lamp", "tag": "Prop", "layer": 0, "active": true,
//!       "transform": { "position": [0,1,0], "rotation": [0,0,0,1], "scale": [1,1,1] },
//!       "parent": null,
//!       "components": [ { "type": "MeshRenderer", "state": "<base64>" } ] }
//!   ]
//! }
//! ```
//!
//! A parent always precedes its children, and siblings appear in child order.
//! Components without a state codec are written without `state`.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ember_core::{EmberError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ObjectHandle;
use crate::component::ComponentRegistry;
use crate::object::GameObject;
use crate::scene::Scene;
use crate::transform::Transform;

pub const SCENE_FORMAT_VERSION: u32 = 1;

/// Saves and loads whole scenes.
pub trait SceneSerializer: Send + Sync {
    fn save_to_file(&self, scene: &Scene, path: &Path) -> Result<()>;
    fn load_from_file(&self, path: &Path) -> Result<Scene>;
}

// ─── Document Model ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub format_version: u32,
    pub name: String,
    pub objects: Vec<ObjectRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub name: String,
    pub tag: String,
    pub layer: u32,
    pub active: bool,
    pub transform: Transform,
    /// Index of the parent record; `None` for roots.
    pub parent: Option<usize>,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    #[serde(rename = "type")]
    pub type_name: String,
    /// Base64 of the binary state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

// ─── JSON Serializer ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JsonSceneSerializer {
    registry: Arc<ComponentRegistry>,
    pretty: bool,
}

impl JsonSceneSerializer {
    #[must_use]
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            registry,
            pretty: false,
        }
    }

    /// Indented output, for files meant to be diffed or read by people.
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Captures `scene` as a document.
    pub fn to_document(&self, scene: &Scene) -> Result<SceneDocument> {
        let mut index_of: FxHashMap<ObjectHandle, usize> = FxHashMap::default();
        let mut objects = Vec::with_capacity(scene.len());

        for &root in scene.root_objects() {
            for handle in scene.subtree(root) {
                let Some(object) = scene.get(handle) else {
                    continue;
                };
                let mut record = self.record_for(object)?;
                record.parent = object.parent().and_then(|p| index_of.get(&p).copied());
                index_of.insert(handle, objects.len());
                objects.push(record);
            }
        }

        Ok(SceneDocument {
            format_version: SCENE_FORMAT_VERSION,
            name: scene.name.clone(),
            objects,
        })
    }

    fn record_for(&self, object: &GameObject) -> Result<ObjectRecord> {
        let components = object
            .components()
            .iter()
            .map(|component| -> Result<ComponentRecord> {
                let state = self
                    .registry
                    .encode(&**component)
                    .map_err(|e| {
                        EmberError::serialization(
                            &format!("component '{}' on '{}'", component.type_name(), object.name),
                            e,
                        )
                    })?
                    .map(|bytes| BASE64.encode(bytes));
                Ok(ComponentRecord {
                    type_name: component.type_name().to_owned(),
                    state,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ObjectRecord {
            name: object.name.clone(),
            tag: object.tag.clone(),
            layer: object.layer,
            active: object.active,
            transform: object.transform,
            parent: None,
            components,
        })
    }

    /// Rebuilds a scene from a document.
    pub fn from_document(&self, document: SceneDocument) -> Result<Scene> {
        if document.format_version != SCENE_FORMAT_VERSION {
            return Err(EmberError::Serialization(format!(
                "unsupported scene format version {} (expected {SCENE_FORMAT_VERSION})",
                document.format_version
            )));
        }

        let mut scene = Scene::new(document.name);
        let mut handles: Vec<ObjectHandle> = Vec::with_capacity(document.objects.len());

        for (index, record) in document.objects.into_iter().enumerate() {
            let context = format!("object #{index} '{}'", record.name);
            let mut object = GameObject::new(record.name)
                .with_tag(record.tag)
                .with_layer(record.layer)
                .with_transform(record.transform);
            object.active = record.active;

            for component in &record.components {
                let state = component
                    .state
                    .as_deref()
                    .map(|encoded| BASE64.decode(encoded))
                    .transpose()
                    .map_err(|e| EmberError::serialization(&context, e))?;
                let component = self
                    .registry
                    .decode(&component.type_name, state.as_deref())
                    .map_err(|e| EmberError::serialization(&context, e))?;
                object.add_boxed_component(component);
            }

            let handle = match record.parent {
                None => scene.add_object(object),
                Some(parent) if parent < index => scene.add_child(handles[parent], object)?,
                Some(parent) => {
                    return Err(EmberError::Serialization(format!(
                        "{context}: parent index {parent} does not precede the object"
                    )));
                }
            };
            handles.push(handle);
        }

        Ok(scene)
    }

    /// Serializes `scene` to JSON bytes.
    pub fn to_bytes(&self, scene: &Scene) -> Result<Vec<u8>> {
        let document = self.to_document(scene)?;
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&document)
        } else {
            serde_json::to_vec(&document)
        };
        bytes.map_err(|e| EmberError::serialization("encode scene", e))
    }

    pub fn from_bytes(&self, bytes: &[u8]) -> Result<Scene> {
        let document: SceneDocument =
            serde_json::from_slice(bytes).map_err(|e| EmberError::serialization("parse scene", e))?;
        self.from_document(document)
    }
}

impl SceneSerializer for JsonSceneSerializer {
    fn save_to_file(&self, scene: &Scene, path: &Path) -> Result<()> {
        let document = self.to_document(scene)?;
        let io_error = |e: std::io::Error| EmberError::serialization(&path.display().to_string(), e);

        let file = fs::File::create(path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut writer, &document)
        } else {
            serde_json::to_writer(&mut writer, &document)
        };
        written.map_err(|e| EmberError::serialization("encode scene", e))?;
        writer.flush().map_err(io_error)?;

        log::debug!(
            "Saved scene '{}' ({} objects) to {}",
            scene.name,
            document.objects.len(),
            path.display()
        );
        Ok(())
    }

    fn load_from_file(&self, path: &Path) -> Result<Scene> {
        let file = fs::File::open(path)
            .map_err(|e| EmberError::serialization(&path.display().to_string(), e))?;
        let document: SceneDocument = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| EmberError::serialization(&path.display().to_string(), e))?;
        self.from_document(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{CullingState, MeshRenderer, PointLight};
    use glam::{Quat, Vec3};

    fn serializer() -> JsonSceneSerializer {
        JsonSceneSerializer::new(Arc::new(ComponentRegistry::with_builtins()))
    }

    fn level() -> Scene {
        let mut scene = Scene::new("Level");
        let room = scene.create_object("room");
        let lamp = scene
            .build_object("lamp")
            .with_parent(room)
            .with_transform(
                Transform::from_position(Vec3::new(2.0, 3.0, 4.0))
                    .with_rotation(Quat::from_rotation_y(1.25)),
            )
            .with_component(MeshRenderer::new("lamp.mesh", "brass"))
            .with_component(CullingState::default())
            .build()
            .unwrap();
        scene
            .build_object("bulb")
            .with_parent(lamp)
            .with_component(PointLight::default())
            .build()
            .unwrap();
        scene.create_child(room, "door").unwrap();
        scene.build_object("sky").with_layer(9).inactive().build().unwrap();
        scene
    }

    #[test]
    fn document_is_preordered_with_parent_indices() {
        let document = serializer().to_document(&level()).unwrap();
        let layout: Vec<(&str, Option<usize>)> = document
            .objects
            .iter()
            .map(|o| (o.name.as_str(), o.parent))
            .collect();
        assert_eq!(
            layout,
            [
                ("room", None),
                ("lamp", Some(0)),
                ("bulb", Some(1)),
                ("door", Some(0)),
                ("sky", None)
            ]
        );
        let lamp_components = &document.objects[1].components;
        assert!(lamp_components[0].state.is_some());
        assert_eq!(lamp_components[1].type_name, "CullingState");
        assert!(lamp_components[1].state.is_none());
    }

    #[test]
    fn bytes_round_trip_preserves_tree_and_state() {
        let serializer = serializer();
        let bytes = serializer.to_bytes(&level()).unwrap();
        let restored = serializer.from_bytes(&bytes).unwrap();

        assert_eq!(restored.name, "Level");
        assert_eq!(restored.root_objects().len(), 2);
        let lamp = restored.get(restored.find_by_name("lamp").unwrap()).unwrap();
        assert_eq!(lamp.component::<MeshRenderer>().unwrap().material, "brass");
        assert_eq!(lamp.transform.position, Vec3::new(2.0, 3.0, 4.0));

        let sky = restored.get(restored.find_by_name("sky").unwrap()).unwrap();
        assert!(!sky.active);
        assert_eq!(sky.layer, 9);

        let bulb = restored.find_by_name("bulb").unwrap();
        assert_eq!(restored.get(bulb).unwrap().parent(), restored.find_by_name("lamp"));
        assert!(
            lamp.transform
                .rotation
                .abs_diff_eq(Quat::from_rotation_y(1.25), 1e-6)
        );
    }

    #[test]
    fn malformed_documents_are_serialization_errors() {
        let serializer = serializer();
        let forward_parent = SceneDocument {
            format_version: SCENE_FORMAT_VERSION,
            name: "bad".into(),
            objects: vec![ObjectRecord {
                name: "orphan".into(),
                tag: "Untagged".into(),
                layer: 0,
                active: true,
                transform: Transform::IDENTITY,
                parent: Some(3),
                components: Vec::new(),
            }],
        };
        assert!(matches!(
            serializer.from_document(forward_parent),
            Err(EmberError::Serialization(_))
        ));

        let mut document = serializer.to_document(&level()).unwrap();
        document.objects[2].components[0].state = Some("!!not base64!!".into());
        assert!(matches!(serializer.from_document(document), Err(EmberError::Serialization(_))));

        assert!(matches!(serializer.from_bytes(b"{ not json"), Err(EmberError::Serialization(_))));
    }
}
