//! Concrete adapters, one per backend family.
//!
//! | Adapter | query | get | delete | edit | add | flush |
//! |---|---|---|---|---|---|---|
//! | `local_memory` | ✓ | ✓ | ✓ | ✓ | ✓ | ✓ |
//! | `database` | ✓ | ✓ | ✓ | ✓ | ✓ | ✓ |
//! | `file_based` | | ✓ | ✓ | ✓ | ✓ | ✓ |
//! | `redis` | ✓ | ✓ | ✓ | ✓ | ✓ | ✓ |
//! | `redis_cluster` | | ✓ | ✓ | ✓ | ✓ | |
//! | `memcached` | | ✓ | ✓ | ✓ | ✓ | (override) |
//! | `dummy` | | | | | | |
//! | `generic` | | ✓ | ✓ | (override) | (override) | (override) |

pub mod database;
pub mod dummy;
pub mod file_based;
pub mod generic;
pub mod local_memory;
pub mod memcached;
pub mod redis;
pub mod redis_cluster;

pub use database::DatabaseAdapter;
pub use dummy::DummyAdapter;
pub use file_based::FileBasedAdapter;
pub use generic::GenericAdapter;
pub use local_memory::LocalMemoryAdapter;
pub use memcached::MemcachedAdapter;
pub use redis::RedisAdapter;
pub use redis_cluster::RedisClusterAdapter;
