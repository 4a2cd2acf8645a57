// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Address pool validation.
//!
//! An address pool entry is either a CIDR block (`192.0.2.0/24`) or an
//! inclusive IP range written as `start-end` (`192.0.2.10-192.0.2.90`).
//! Validation is a pure function with no side effects; it runs once per
//! entry before the entry is placed into any compiled output, and a single
//! invalid entry aborts the compilation of the containing section.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::errors::InvalidAddressPool;

/// Validate one address pool entry.
///
/// Entries without a `-` must parse as a CIDR block. Entries with a `-`
/// must split into exactly two trimmed IP addresses of the same family
/// with `start <= end` under byte-wise comparison.
///
/// # Errors
///
/// Returns an [`InvalidAddressPool`] naming the offending entry and the
/// reason it was rejected.
///
/// # Example
///
/// ```rust
/// use metalcast::address_pool::validate_address_pool;
///
/// assert!(validate_address_pool("10.0.0.0/16").is_ok());
/// assert!(validate_address_pool("10.0.0.10-10.0.0.90").is_ok());
/// assert!(validate_address_pool("10.0.0.90-10.0.0.10").is_err());
/// ```
pub fn validate_address_pool(pool: &str) -> Result<(), InvalidAddressPool> {
    if !pool.contains('-') {
        return match pool.parse::<IpNet>() {
            Ok(_) => Ok(()),
            Err(_) => Err(InvalidAddressPool::NotCidr {
                pool: pool.to_string(),
            }),
        };
    }

    let mut parts = pool.splitn(2, '-');
    let (Some(start_raw), Some(end_raw)) = (parts.next(), parts.next()) else {
        return Err(InvalidAddressPool::MalformedRange {
            pool: pool.to_string(),
        });
    };

    let start: IpAddr =
        start_raw
            .trim()
            .parse()
            .map_err(|_| InvalidAddressPool::InvalidStart {
                pool: pool.to_string(),
                start: start_raw.to_string(),
            })?;
    let end: IpAddr = end_raw
        .trim()
        .parse()
        .map_err(|_| InvalidAddressPool::InvalidEnd {
            pool: pool.to_string(),
            end: end_raw.to_string(),
        })?;

    if start.is_ipv4() != end.is_ipv4() {
        return Err(InvalidAddressPool::MixedFamilies {
            pool: pool.to_string(),
            start,
            end,
        });
    }

    // Same family, so the derived ordering is byte-wise.
    if start > end {
        return Err(InvalidAddressPool::StartAfterEnd {
            pool: pool.to_string(),
            start,
            end,
        });
    }

    Ok(())
}

/// Validate a whole list of address pool entries, failing on the first
/// invalid one.
pub fn validate_address_pools<'a, I>(pools: I) -> Result<(), InvalidAddressPool>
where
    I: IntoIterator<Item = &'a String>,
{
    for pool in pools {
        validate_address_pool(pool)?;
    }
    Ok(())
}
