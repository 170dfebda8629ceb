pub(crate) mod batteries;
pub(crate) mod experiments;
pub(crate) mod export;
