//! Positional astronomy for planning observations: epochs and sidereal
//! time, sky and site coordinates, observatory and source lookup, and
//! rise/set searches.

pub mod catalog;
pub mod coords;
pub mod observatory;
pub mod riseset;
pub mod time;

pub use catalog::{CatalogError, ResolvedSource, SourceCatalog, resolve_source};
pub use coords::{CoordinateError, EarthLocation, SkyCoord};
pub use observatory::{ObservatoryError, ObservatoryRegistry, ResolvedObservatory};
pub use riseset::{Observer, RiseSet, RiseSetError, RiseSetQuery, Which, rise_set};
pub use time::{Epoch, TimeError, format_sidereal_time};
