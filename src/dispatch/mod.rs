pub(crate) mod context;
pub(crate) mod dispatcher;
pub(crate) mod state;
