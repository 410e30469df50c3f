// Domain layer: core models, static profession knowledge and ports (interfaces).

pub mod catalog;
pub mod model;
pub mod ports;
