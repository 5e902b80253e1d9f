pub mod enhancement;
