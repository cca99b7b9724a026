//! Prefabs: reusable, serialized object trees.
//!
//! A [`PrefabAsset`] is the byte payload of one serialized scene holding
//! exactly one root. [`PrefabSystem`] produces assets from live subtrees and
//! instantiates them into scenes. Both directions go through the configured
//! [`SceneSerializer`] and a scoped temporary file that is deleted on drop,
//! including on error paths.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ember_core::{EmberError, EngineSettings, Result};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::ObjectHandle;
use crate::clone::SceneCloner;
use crate::component::ComponentRegistry;
use crate::scene::Scene;
use crate::serializer::{JsonSceneSerializer, SceneSerializer};

const TEMP_PREFIX: &str = "ember-prefab-";
const TEMP_SUFFIX: &str = ".json";

// ─── Asset ────────────────────────────────────────────────────────────────────

/// Serialized single-root scene. Cheap to clone; the payload is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefabAsset {
    id: Uuid,
    payload: Arc<[u8]>,
}

impl PrefabAsset {
    /// Wraps a payload under a fresh id.
    pub fn new(payload: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: payload.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Writes the payload to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, &self.payload)?;
        log::debug!("Saved prefab {} ({} bytes) to {}", self.id, self.payload.len(), path.display());
        Ok(())
    }

    /// Reads a payload written by [`save`](Self::save). The loaded asset gets
    /// a fresh id.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(bytes) => Ok(Self::new(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(EmberError::ResourceNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

// ─── System ───────────────────────────────────────────────────────────────────

/// Creates and instantiates prefabs.
#[derive(Debug)]
pub struct PrefabSystem<S: SceneSerializer = JsonSceneSerializer> {
    registry: Arc<ComponentRegistry>,
    serializer: S,
    temp_dir: Option<PathBuf>,
}

impl PrefabSystem<JsonSceneSerializer> {
    /// Prefab system backed by the JSON scene format.
    #[must_use]
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        let serializer = JsonSceneSerializer::new(Arc::clone(&registry));
        Self::with_serializer(registry, serializer)
    }
}

impl<S: SceneSerializer> PrefabSystem<S> {
    pub fn with_serializer(registry: Arc<ComponentRegistry>, serializer: S) -> Self {
        Self {
            registry,
            serializer,
            temp_dir: None,
        }
    }

    /// Applies the temp directory from `settings`.
    #[must_use]
    pub fn with_settings(mut self, settings: &EngineSettings) -> Self {
        self.temp_dir.clone_from(&settings.temp_dir);
        self
    }

    #[must_use]
    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    fn temp_file(&self) -> Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(TEMP_SUFFIX);
        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        file.map_err(|e| EmberError::serialization("create prefab temp file", e))
    }

    /// Serializes `root` and its descendants into a new asset.
    ///
    /// ## Errors
    /// * `ObjectNotFound` / `ComponentNotRegistered` - the subtree cannot be cloned.
    /// * `Serialization` - the scene serializer or temp file failed.
    pub fn create_prefab(&self, scene: &Scene, root: ObjectHandle) -> Result<PrefabAsset> {
        let mut transient = Scene::new(format!("{} (prefab)", scene.name));
        SceneCloner::new(&self.registry).clone_tree(scene, root, &mut transient)?;

        let file = self.temp_file()?;
        self.serializer.save_to_file(&transient, file.path())?;
        let payload = fs::read(file.path())
            .map_err(|e| EmberError::serialization("read prefab temp file", e))?;

        let asset = PrefabAsset::new(payload);
        log::info!(
            "Created prefab {} from '{}' ({} objects, {} bytes)",
            asset.id,
            scene.name,
            transient.len(),
            asset.payload.len()
        );
        Ok(asset)
    }

    /// Instantiates `asset` into `target`; returns the new root.
    ///
    /// Every call produces an independent copy.
    ///
    /// ## Errors
    /// * `Serialization` - the payload could not be loaded.
    /// * `InvalidPrefab` - the payload does not hold exactly one root.
    pub fn instantiate_prefab(&self, asset: &PrefabAsset, target: &mut Scene) -> Result<ObjectHandle> {
        let mut file = self.temp_file()?;
        file.write_all(asset.payload())
            .and_then(|()| file.flush())
            .map_err(|e| EmberError::serialization("write prefab temp file", e))?;

        let transient = self.serializer.load_from_file(file.path())?;
        let root = match transient.root_objects() {
            [root] => *root,
            [] => {
                return Err(EmberError::InvalidPrefab {
                    id: asset.id.to_string(),
                    reason: "payload contains no root object".into(),
                });
            }
            roots => {
                return Err(EmberError::InvalidPrefab {
                    id: asset.id.to_string(),
                    reason: format!("payload contains {} root objects, expected 1", roots.len()),
                });
            }
        };

        let handle = SceneCloner::new(&self.registry).clone_tree(&transient, root, target)?;
        log::debug!("Instantiated prefab {} into scene '{}'", asset.id, target.name);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{MeshRenderer, PointLight};

    fn system(temp_dir: &Path) -> PrefabSystem {
        let settings = EngineSettings {
            temp_dir: Some(temp_dir.to_path_buf()),
            ..EngineSettings::default()
        };
        PrefabSystem::new(Arc::new(ComponentRegistry::with_builtins())).with_settings(&settings)
    }

    fn crate_scene() -> (Scene, ObjectHandle) {
        let mut scene = Scene::new("warehouse");
        let root = scene
            .build_object("crate")
            .with_component(MeshRenderer::new("crate.mesh", "wood"))
            .build()
            .unwrap();
        scene
            .build_object("glow")
            .with_parent(root)
            .with_component(PointLight::default())
            .build()
            .unwrap();
        (scene, root)
    }

    #[test]
    fn temp_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let system = system(dir.path());
        let (scene, root) = crate_scene();

        let asset = system.create_prefab(&scene, root).unwrap();
        let mut target = Scene::new("level");
        system.instantiate_prefab(&asset, &mut target).unwrap();

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn zero_and_multiple_roots_are_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let system = system(dir.path());
        let mut target = Scene::new("level");

        let empty = PrefabAsset::new(system.serializer().to_bytes(&Scene::new("empty")).unwrap());
        assert!(matches!(
            system.instantiate_prefab(&empty, &mut target),
            Err(EmberError::InvalidPrefab { .. })
        ));

        let mut two = Scene::new("two");
        two.create_object("a");
        two.create_object("b");
        let two = PrefabAsset::new(system.serializer().to_bytes(&two).unwrap());
        assert!(matches!(
            system.instantiate_prefab(&two, &mut target),
            Err(EmberError::InvalidPrefab { .. })
        ));
        assert!(target.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn garbage_payload_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let system = system(dir.path());
        let mut target = Scene::new("level");

        let asset = PrefabAsset::new(b"\x00\x01 definitely not a scene".to_vec());
        assert!(matches!(
            system.instantiate_prefab(&asset, &mut target),
            Err(EmberError::Serialization(_))
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn asset_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crate.prefab");
        let asset = PrefabAsset::new(b"payload".to_vec());

        asset.save(&path).unwrap();
        let loaded = PrefabAsset::load(&path).unwrap();
        assert_eq!(loaded.payload(), asset.payload());
        assert_ne!(loaded.id(), asset.id());

        assert!(matches!(
            PrefabAsset::load(dir.path().join("missing.prefab")),
            Err(EmberError::ResourceNotFound { .. })
        ));
    }
}
