pub mod syn_types;
