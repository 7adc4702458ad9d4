use rstdev_storage::engine::rocksdb::db::DB;
use rstdev_storage::engine::rocksdb::executor::Executor;
use rstdev_storage::engine::rocksdb::options::Options;

use crate::common::types::CommonError;
use crate::config::{Config, StateDatabase};

use super::merge_operators::{merge_index, MERGE_INDEX_ID};

/// `Builder` opens the RocksDB state database described by the node configuration
pub struct Builder {
    cfg: Config,
}

impl Builder {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    /// `build` opens the database picked by `select`, creating it and its column family
    /// on first use
    pub fn build(
        &self,
        select: impl FnOnce(&Config) -> StateDatabase,
    ) -> Result<Executor, CommonError> {
        let state = select(&self.cfg);
        let (path, column_family) = state.get_location();
        let wal_dir = state.get_wal_dir();

        let mut db_opts = Options::new(path, column_family.clone());
        db_opts
            .build_default_opts()
            .set_db_opts(move |opt| {
                opt.create_if_missing(true);
                opt.create_missing_column_families(true);
                if let Some(dir) = &wal_dir {
                    opt.set_wal_dir(dir);
                }

                opt
            })
            .set_cf_opts(|opt| {
                opt.set_merge_operator_associative(MERGE_INDEX_ID, merge_index);

                opt
            });

        let mut db = DB::new(db_opts).map_err(|err| CommonError::DbError(err.to_string()))?;
        let instance = db
            .build()
            .map_err(|err| CommonError::DbError(err.to_string()))?;

        db.set_db(instance);
        Ok(Executor::new(db, column_family))
    }
}
