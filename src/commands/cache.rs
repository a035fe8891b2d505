use mintset::source::FsCache;
use mintset::Config;

pub fn run(config: &Config) {
    let cache = FsCache::new(&config.cache_dir);
    let stats = cache.stats();
    println!("Cache: {}", cache.root().display());
    println!("Entries: {}", stats.entries);
    println!("Size: {} bytes", stats.total_bytes);
}
