pub mod depth;
pub mod gga;
pub mod gll;
pub mod heading;
pub mod message;
pub mod mtw;
pub mod mwd;
pub mod mwv;
pub mod rmc;
pub mod vdm;
pub mod vhw;
pub mod vlw;
pub mod vtg;

// Re-export commonly used types
pub use depth::{Dbt, Dpt};
pub use gga::Gga;
pub use gll::Gll;
pub use heading::{Hdm, Hdt};
pub use message::NmeaMessage;
pub use mtw::Mtw;
pub use mwd::Mwd;
pub use mwv::{Mwv, WindReference};
pub use rmc::Rmc;
pub use vdm::Vdm;
pub use vhw::Vhw;
pub use vlw::Vlw;
pub use vtg::Vtg;
