use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SingleflightError<E>
where
    E: std::fmt::Display,
{
    #[error("{0}")]
    InternalError(E),

    #[error("Singleflight call table is poisoned")]
    CallTablePoisoned,
}
