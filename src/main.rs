use log::{error, info, warn};
use meter_topology::config::{StoreConfig, StoreKind};
use meter_topology::store::StoreError;
use meter_topology::{Config, DataStore, MemoryStore, MeterError, MeterTopology, YamlStore};
use std::process::ExitCode;
use std::sync::Arc;

fn open_store(config: &StoreConfig) -> Result<Arc<dyn DataStore>, StoreError> {
    let yaml = YamlStore::open(&config.path)?;
    match config.kind {
        StoreKind::Yaml => Ok(Arc::new(yaml)),
        StoreKind::Memory => {
            let memory = MemoryStore::snapshot(&yaml)?;
            info!("Loaded {} meter entries into memory", memory.keys()?.len());
            Ok(Arc::new(memory))
        }
    }
}

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(config.log_filter()));

    let store: Arc<dyn DataStore> = match open_store(&config.store) {
        Ok(s) => s,
        Err(e) => {
            error!("Unable to open store: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut topology = MeterTopology::new();
    let meters = match topology.load_all(&store, &config.buildings) {
        Ok(m) => m,
        Err(e) => {
            error!("Loading meters failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    for meter in meters.iter() {
        info!("{meter}");
        match topology.upstream_of(meter) {
            Ok(upstream) => info!("  submeter of {}", upstream.identifier()),
            Err(MeterError::NoUpstream) => info!("  no upstream meter"),
            Err(e) => warn!("  {e}"),
        }
        match topology.available_ac_types(meter) {
            Ok(types) => {
                let types: Vec<String> = types.iter().map(|t| t.to_string()).collect();
                info!("  AC types: [{}]", types.join(", "));
            }
            Err(e) => warn!("  {e}"),
        }
    }

    info!("Topology of {} meters resolved", topology.meters().len());
    ExitCode::SUCCESS
}
