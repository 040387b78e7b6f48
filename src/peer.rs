//! The orchestrator: a single arena object that assembles the
//! directory, token lock, read/write lock, resource owner, and
//! listener, then drives the construct -> initialize -> start ->
//! destroy lifecycle. Keeps every component wired up from one place
//! rather than having each hold references to the others.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::directory::PeerDirectory;
use crate::errors::Result;
use crate::monitor::Monitor;
use crate::nameservice;
use crate::owner::ResourceOwner;
use crate::rwlock::ReadWriteLock;
use crate::store::RecordStore;
use crate::tokenlock::TokenLock;
use crate::transport::Listener;
use crate::util;

pub struct Peer {
    pub id: u64,
    pub addr: SocketAddr,
    hash: String,
    name_service: nameservice::Client,
    peer_type: String,
    dispatcher: Arc<Dispatcher>,
    listener: Arc<Listener>,
}

impl Peer {
    /// Resolves the bind address, registers with the name service,
    /// builds the directory/lock/owner trio, and binds the listener.
    /// Does not yet accept connections or contact other peers.
    pub fn construct(cfg: &Config) -> Result<Peer> {
        let bind_addr = util::resolve_bind_address(&cfg.bind_host, cfg.bind_port)?;
        let ns_addr: SocketAddr = cfg
            .name_service
            .parse()
            .map_err(|e| crate::errors::ErrorKind::InvalidAddress(format!("{}: {}", cfg.name_service, e)))?;
        let name_service = nameservice::Client::new(ns_addr);

        let listener = Arc::new(Listener::bind(bind_addr)?);
        let published_addr = listener.local_addr;

        let (id, hash) = name_service.register(&cfg.peer_type, published_addr)?;
        info!("Registered as peer {} at {}", id, published_addr);

        let monitor = Monitor::new(id, published_addr);
        let directory = PeerDirectory::new(id, published_addr, monitor.clone());
        let token = TokenLock::new(id, monitor);
        let rwlock = ReadWriteLock::new(token);
        let store = RecordStore::load(&cfg.store_file)?;
        let owner = ResourceOwner::new(id, cfg.peer_type.clone(), directory, rwlock, store);
        let dispatcher = Arc::new(Dispatcher::new(owner));

        Ok(Peer {
            id,
            addr: published_addr,
            hash,
            name_service,
            peer_type: cfg.peer_type.clone(),
            dispatcher,
            listener,
        })
    }

    /// Populates the directory from the name service and bootstraps
    /// the token lock's initial holder.
    pub fn initialize(&self) -> Result<()> {
        let known = self.name_service.require_all(&self.peer_type)?;
        let known = known
            .into_iter()
            .map(|(id, addr)| crate::directory::NsPeer { id, addr })
            .collect();
        self.dispatcher.owner().directory().initialize(known);
        self.dispatcher.owner().lock().token().initialize();
        Ok(())
    }

    /// Spawns the accept loop on its own thread and returns immediately.
    pub fn start(&self) {
        info!("Listening on {}", self.listener.local_addr);
        let listener = self.listener.clone();
        let dispatcher = self.dispatcher.clone();
        thread::spawn(move || listener.serve(dispatcher));
    }

    pub fn owner(&self) -> &ResourceOwner {
        self.dispatcher.owner()
    }

    /// Graceful departure: hand off the token if held or resident,
    /// notify the directory, then unregister from the name service.
    pub fn destroy(&self) {
        self.owner().lock().token().destroy();
        self.owner().directory().destroy();
        if let Err(e) = self.name_service.unregister(self.id, &self.peer_type, &self.hash) {
            debug!("Failed to unregister from name service: {}", e);
        }
    }
}
