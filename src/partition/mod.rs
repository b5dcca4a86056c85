pub(crate) mod slicer;
