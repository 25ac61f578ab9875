/// Header carrying the client address set by the edge proxy
pub const REAL_IP_HEADER: &str = "x-real-ip";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Pick the client IP from forwarding headers, `x-real-ip` first.
///
/// `x-forwarded-for` may list every hop; the first entry is the client.
/// Values are not checked for being well-formed addresses. Blank headers count
/// as absent.
pub fn resolve_client_ip(
    real_ip: Option<&str>,
    forwarded_for: Option<&str>,
    default_ip: &str,
) -> String {
    let real_ip = real_ip.map(str::trim).filter(|v| !v.is_empty());
    let forwarded = forwarded_for
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    real_ip.or(forwarded).unwrap_or(default_ip).to_string()
}
