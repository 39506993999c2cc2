//! Named, typed output cells published by the bridge.
//!
//! The registry is the passive name-to-cell mapping that a real-time host reads from.
//! Writers hold an [`OutputPin`] and update it with a single relaxed atomic store, so
//! the sampling task never allocates or locks. Readers look cells up by name.
//!
//! ```rust
//! use fgfdm::outputs::{OutputRegistry, OutputValue};
//!
//! let mut registry = OutputRegistry::new();
//! let rpm = registry.register::<f64>("fgfdm.engine.0.rpm")?;
//! rpm.set(2450.0);
//!
//! assert_eq!(registry.get("fgfdm.engine.0.rpm"), Some(OutputValue::Float(2450.0)));
//! # Ok::<(), fgfdm::BridgeError>(())
//! ```

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::{BridgeError, Result};

/// Type of an output cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputKind {
    /// Single bit
    Bit,
    /// 32-bit unsigned integer
    U32,
    /// 32-bit signed integer
    S32,
    /// 64-bit floating point
    Float,
}

/// Snapshot of one output cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum OutputValue {
    Bit(bool),
    U32(u32),
    S32(i32),
    Float(f64),
}

impl OutputValue {
    pub fn kind(&self) -> OutputKind {
        match self {
            OutputValue::Bit(_) => OutputKind::Bit,
            OutputValue::U32(_) => OutputKind::U32,
            OutputValue::S32(_) => OutputKind::S32,
            OutputValue::Float(_) => OutputKind::Float,
        }
    }

    fn from_bits(kind: OutputKind, bits: u64) -> Self {
        match kind {
            OutputKind::Bit => OutputValue::Bit(<bool as OutputType>::from_bits(bits)),
            OutputKind::U32 => OutputValue::U32(<u32 as OutputType>::from_bits(bits)),
            OutputKind::S32 => OutputValue::S32(<i32 as OutputType>::from_bits(bits)),
            OutputKind::Float => OutputValue::Float(<f64 as OutputType>::from_bits(bits)),
        }
    }
}

impl std::fmt::Display for OutputValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputValue::Bit(v) => write!(f, "{}", u8::from(*v)),
            OutputValue::U32(v) => write!(f, "{v}"),
            OutputValue::S32(v) => write!(f, "{v}"),
            OutputValue::Float(v) => write!(f, "{v}"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for bool {}
    impl Sealed for u32 {}
    impl Sealed for i32 {}
    impl Sealed for f64 {}
}

/// Value types an output cell can hold.
pub trait OutputType: sealed::Sealed + Copy + Send + Sync + 'static {
    const KIND: OutputKind;

    fn into_bits(self) -> u64;
    fn from_bits(bits: u64) -> Self;
}

impl OutputType for bool {
    const KIND: OutputKind = OutputKind::Bit;

    fn into_bits(self) -> u64 {
        u64::from(self)
    }
    fn from_bits(bits: u64) -> Self {
        bits != 0
    }
}

impl OutputType for u32 {
    const KIND: OutputKind = OutputKind::U32;

    fn into_bits(self) -> u64 {
        u64::from(self)
    }
    fn from_bits(bits: u64) -> Self {
        bits as u32
    }
}

impl OutputType for i32 {
    const KIND: OutputKind = OutputKind::S32;

    fn into_bits(self) -> u64 {
        u64::from(self as u32)
    }
    fn from_bits(bits: u64) -> Self {
        bits as u32 as i32
    }
}

impl OutputType for f64 {
    const KIND: OutputKind = OutputKind::Float;

    fn into_bits(self) -> u64 {
        self.to_bits()
    }
    fn from_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

/// Write handle for one registered output cell.
#[derive(Debug)]
pub struct OutputPin<T: OutputType> {
    cell: Arc<AtomicU64>,
    _type: PhantomData<T>,
}

impl<T: OutputType> OutputPin<T> {
    #[inline]
    pub fn set(&self, value: T) {
        self.cell.store(value.into_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> T {
        T::from_bits(self.cell.load(Ordering::Relaxed))
    }
}

#[derive(Debug)]
struct Cell {
    kind: OutputKind,
    bits: Arc<AtomicU64>,
}

/// Name-to-cell mapping, iterated in name order.
#[derive(Debug, Default)]
pub struct OutputRegistry {
    cells: BTreeMap<String, Cell>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a zero-initialised cell and returns its write handle.
    ///
    /// # Errors
    ///
    /// [`BridgeError::OutputRegistration`] if the name is empty, has an empty
    /// dot-separated segment, or is already registered.
    pub fn register<T: OutputType>(&mut self, name: impl Into<String>) -> Result<OutputPin<T>> {
        let name = name.into();
        if name.is_empty() || name.split('.').any(str::is_empty) {
            return Err(BridgeError::output_registration(name, "empty name segment"));
        }
        if self.cells.contains_key(&name) {
            return Err(BridgeError::output_registration(name, "duplicate name"));
        }

        let bits = Arc::new(AtomicU64::new(0));
        self.cells.insert(name, Cell { kind: T::KIND, bits: Arc::clone(&bits) });
        Ok(OutputPin { cell: bits, _type: PhantomData })
    }

    /// Current value of the named cell.
    pub fn get(&self, name: &str) -> Option<OutputValue> {
        self.cells.get(name).map(Cell::value)
    }

    /// Type of the named cell.
    pub fn kind(&self, name: &str) -> Option<OutputKind> {
        self.cells.get(name).map(|cell| cell.kind)
    }

    /// All cells with their current values, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, OutputValue)> + '_ {
        self.cells.iter().map(|(name, cell)| (name.as_str(), cell.value()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Cell {
    fn value(&self) -> OutputValue {
        OutputValue::from_bits(self.kind, self.bits.load(Ordering::Relaxed))
    }
}
