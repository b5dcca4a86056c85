pub(crate) mod worker_pool;
