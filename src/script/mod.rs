pub(crate) mod module;
