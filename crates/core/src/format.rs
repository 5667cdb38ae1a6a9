/// Human-readable byte count using binary units, e.g. `12.50 MB`.
pub fn human_bytes(n: u64) -> String {
    const K: f64 = 1024.0;
    let f = n as f64;
    if f >= K * K * K {
        format!("{:.2} GB", f / (K * K * K))
    } else if f >= K * K {
        format!("{:.2} MB", f / (K * K))
    } else if f >= K {
        format!("{:.2} KB", f / K)
    } else {
        format!("{n} B")
    }
}
