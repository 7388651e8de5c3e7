//! Generic containers used by generated code and by the partitioner:
//! the closed hash map ([`hash_map`]), its dictionary specializations
//! ([`dict`]), and the typed list specializations ([`list`]).

pub mod dict;
pub mod hash_map;
pub mod list;

pub use dict::{BlobDictionary, Facets, LongDictionary, ObjectDictionary, RealDictionary, StringDictionary};
pub use hash_map::ClosedHashMap;
pub use list::{BlobList, List, LongList, ObjectList, RealList, StringList};
