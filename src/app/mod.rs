// Application layer: concrete pipelines wired from the core engine and the storage port.

pub mod pipelines;
