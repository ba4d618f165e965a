use bb8::Pool;
use tracing::debug;

use crate::converter::{ConverterRef, ErasedConverter};
use crate::error::SqlMapperError;
use crate::mapper::{RecordMapper, RecordMapperBuilder};
use crate::naming::NameConvention;
use crate::sqlite::{SqliteManager, SqliteOptions, TransactionBehavior, UnitOfWork};

/// Hands out units of work that share one pool and one [`RecordMapper`].
///
/// Plans compiled by one unit of work are reused by every other unit of work from the same
/// factory.
#[derive(Clone)]
pub struct UnitOfWorkFactory {
    pool: Pool<SqliteManager>,
    mapper: RecordMapper,
}

impl UnitOfWorkFactory {
    #[must_use]
    pub fn builder() -> UnitOfWorkFactoryBuilder {
        UnitOfWorkFactoryBuilder::default()
    }

    /// Check out a connection and open a transaction on it.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ConnectionError` if no connection can be checked out, or
    /// `SqlMapperError::SqliteError` if the transaction cannot be started.
    pub async fn create(&self, behavior: TransactionBehavior) -> Result<UnitOfWork, SqlMapperError> {
        let conn = self.pool.get_owned().await?;
        UnitOfWork::begin(conn, self.mapper.clone(), behavior).await
    }

    #[must_use]
    pub fn mapper(&self) -> &RecordMapper {
        &self.mapper
    }

    #[must_use]
    pub fn pool(&self) -> &Pool<SqliteManager> {
        &self.pool
    }
}

impl std::fmt::Debug for UnitOfWorkFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWorkFactory")
            .field("pool", &self.pool.state())
            .field("mapper", &self.mapper)
            .finish()
    }
}

/// Fluent configuration for a [`UnitOfWorkFactory`].
#[derive(Default)]
pub struct UnitOfWorkFactoryBuilder {
    options: Option<SqliteOptions>,
    mapper: RecordMapperBuilder,
}

impl UnitOfWorkFactoryBuilder {
    #[must_use]
    pub fn options(mut self, options: SqliteOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Naming convention for read-side column names. Defaults to snake case.
    #[must_use]
    pub fn name_convention<N: NameConvention + 'static>(mut self, convention: N) -> Self {
        self.mapper = self.mapper.name_convention(convention);
        self
    }

    #[must_use]
    pub fn add_converter<C: ErasedConverter + 'static>(mut self, converter: C) -> Self {
        self.mapper = self.mapper.add_converter(converter);
        self
    }

    #[must_use]
    pub fn converters(mut self, converters: impl IntoIterator<Item = ConverterRef>) -> Self {
        self.mapper = self.mapper.converters(converters);
        self
    }

    /// Validate the configuration and open the pool.
    ///
    /// # Errors
    /// Returns `SqlMapperError::ConfigError` when options are missing or two converters share
    /// a semantic type, and `SqlMapperError::ConnectionError` if the pool cannot be built.
    pub async fn build(self) -> Result<UnitOfWorkFactory, SqlMapperError> {
        let options = self.options.ok_or_else(|| {
            SqlMapperError::ConfigError("sqlite options are required to build a factory".into())
        })?;
        let mapper = self.mapper.build()?;
        debug!(
            target: "sql_mapper::sqlite",
            db_path = %options.db_path,
            pool_size = options.pool_size,
            converters = mapper.registry().len(),
            "building unit of work factory"
        );
        let pool = SqliteManager::new(options).build_pool().await?;
        Ok(UnitOfWorkFactory { pool, mapper })
    }
}
