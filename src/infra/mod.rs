pub mod siri;
