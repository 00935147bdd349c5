mod arena;
mod handle;
mod node;
mod raw_ravl_map;
mod size;

pub(crate) use handle::Handle;
pub(crate) use raw_ravl_map::RawRavlMap;
