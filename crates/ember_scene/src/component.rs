//! Components and the type-name registry.
//!
//! Components are created by name, never by reflection: every concrete type
//! is registered in a [`ComponentRegistry`] with a factory and, when it
//! implements [`BinaryState`], a codec pair. Cloning a component is
//! `create(type_name)` followed by a write/read round trip of its state.
//! Types without a codec clone to their default state.

use std::any::Any;
use std::fmt::Debug;

use ember_core::{EmberError, Result};
use rustc_hash::FxHashMap;

use crate::codec::{ByteReader, ByteWriter};
use crate::components::{CullingState, MeshRenderer, PointLight};

/// Object-safe view of a component attached to a game object.
pub trait Component: Any + Send + Sync + Debug + 'static {
    /// Registry name of the concrete type.
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Implemented by concrete component types. `Component` follows from it.
pub trait ComponentType: Default + Send + Sync + Debug + 'static {
    /// Stable name used by the registry and in serialized scenes.
    const TYPE_NAME: &'static str;
}

impl<T: ComponentType> Component for T {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn Component {
    #[must_use]
    pub fn downcast_ref<T: ComponentType>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    #[must_use]
    pub fn downcast_mut<T: ComponentType>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }

    #[must_use]
    pub fn is<T: ComponentType>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Binary serialize/deserialize contract for component state.
///
/// `read_state` is applied to a freshly created default instance and must
/// consume exactly what `write_state` produced.
pub trait BinaryState {
    fn write_state(&self, writer: &mut ByteWriter);
    fn read_state(&mut self, reader: &mut ByteReader<'_>) -> Result<()>;
}

// ─── Registry ─────────────────────────────────────────────────────────────────

type WriteFn = fn(&dyn Component, &mut ByteWriter) -> Result<()>;
type ReadFn = fn(&mut dyn Component, &mut ByteReader<'_>) -> Result<()>;

#[derive(Debug, Clone, Copy)]
struct StateCodec {
    write: WriteFn,
    read: ReadFn,
}

#[derive(Debug, Clone, Copy)]
struct ComponentEntry {
    create: fn() -> Box<dyn Component>,
    codec: Option<StateCodec>,
}

fn create_default<T: ComponentType>() -> Box<dyn Component> {
    Box::new(T::default())
}

fn type_mismatch<T: ComponentType>(found: &'static str) -> EmberError {
    EmberError::Codec(format!(
        "codec for '{}' applied to a '{found}' component",
        T::TYPE_NAME
    ))
}

fn write_state_erased<T: ComponentType + BinaryState>(
    component: &dyn Component,
    writer: &mut ByteWriter,
) -> Result<()> {
    let typed = component
        .downcast_ref::<T>()
        .ok_or_else(|| type_mismatch::<T>(component.type_name()))?;
    typed.write_state(writer);
    Ok(())
}

fn read_state_erased<T: ComponentType + BinaryState>(
    component: &mut dyn Component,
    reader: &mut ByteReader<'_>,
) -> Result<()> {
    let found = component.type_name();
    component
        .downcast_mut::<T>()
        .ok_or_else(|| type_mismatch::<T>(found))?
        .read_state(reader)
}

/// Maps component type names to factories and optional state codecs.
#[derive(Debug, Default, Clone)]
pub struct ComponentRegistry {
    entries: FxHashMap<&'static str, ComponentEntry>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every component type shipped by this crate.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register_serializable::<MeshRenderer>()
            .register_serializable::<PointLight>()
            .register::<CullingState>();
        registry
    }

    /// Registers a factory-only type. Clones of it start from default state.
    pub fn register<T: ComponentType>(&mut self) -> &mut Self {
        self.insert(
            T::TYPE_NAME,
            ComponentEntry {
                create: create_default::<T>,
                codec: None,
            },
        );
        self
    }

    /// Registers a type whose state round-trips through [`BinaryState`].
    pub fn register_serializable<T: ComponentType + BinaryState>(&mut self) -> &mut Self {
        self.insert(
            T::TYPE_NAME,
            ComponentEntry {
                create: create_default::<T>,
                codec: Some(StateCodec {
                    write: write_state_erased::<T>,
                    read: read_state_erased::<T>,
                }),
            },
        );
        self
    }

    fn insert(&mut self, name: &'static str, entry: ComponentEntry) {
        if self.entries.insert(name, entry).is_some() {
            log::warn!("Component type '{name}' registered twice, keeping the latest");
        }
    }

    fn entry(&self, type_name: &str) -> Result<&ComponentEntry> {
        self.entries
            .get(type_name)
            .ok_or_else(|| EmberError::ComponentNotRegistered(type_name.to_owned()))
    }

    #[must_use]
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    #[must_use]
    pub fn has_codec(&self, type_name: &str) -> bool {
        self.entries
            .get(type_name)
            .is_some_and(|entry| entry.codec.is_some())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Creates a default instance of the named type.
    pub fn create(&self, type_name: &str) -> Result<Box<dyn Component>> {
        Ok((self.entry(type_name)?.create)())
    }

    /// Serializes the state of `component`; `None` for factory-only types.
    pub fn encode(&self, component: &dyn Component) -> Result<Option<Vec<u8>>> {
        let Some(codec) = self.entry(component.type_name())?.codec else {
            return Ok(None);
        };
        let mut writer = ByteWriter::new();
        (codec.write)(component, &mut writer)?;
        Ok(Some(writer.into_bytes()))
    }

    /// Creates the named type and restores `state` into it.
    ///
    /// `None` yields a default instance. State for a factory-only type, or
    /// state with unread trailing bytes, is a `Codec` error.
    pub fn decode(&self, type_name: &str, state: Option<&[u8]>) -> Result<Box<dyn Component>> {
        let entry = self.entry(type_name)?;
        let mut component = (entry.create)();
        match (state, entry.codec) {
            (None, _) => {}
            (Some(bytes), Some(codec)) => {
                let mut reader = ByteReader::new(bytes);
                (codec.read)(&mut *component, &mut reader)?;
                reader.finish()?;
            }
            (Some(_), None) => {
                return Err(EmberError::Codec(format!(
                    "'{type_name}' has no state codec but state was supplied"
                )));
            }
        }
        Ok(component)
    }

    /// Same-type copy of `component` with independent state.
    pub fn clone_component(&self, component: &dyn Component) -> Result<Box<dyn Component>> {
        let state = self.encode(component)?;
        self.decode(component.type_name(), state.as_deref())
    }
}
