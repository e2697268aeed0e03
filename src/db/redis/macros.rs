/// Read-through caching for a provider call.
///
/// Looks the key up in the cache first; on a miss (including cache errors,
/// which `get_from_cache` degrades to misses) it runs the block, queues the
/// result for a background write, and returns it.
///
/// # Arguments
/// * `$cache`: a `Cache` instance.
/// * `$key`: the `CacheKey` to store the value under.
/// * `$ttl`: time-to-live for the cached value, in seconds.
/// * `$block`: the async block computing the value on a miss.
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
