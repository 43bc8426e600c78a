use bridge_core::{Error, Result};

/// A Kodo region with the hosts serving each API role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    /// Region id used in bucket creation, e.g. `z1`.
    pub id: &'static str,
    /// Human readable name.
    pub name: &'static str,
    /// Bucket management host, shared by all regions.
    pub bucket_manage: &'static str,
    /// Upload host for direct and multipart uploads.
    pub upload: &'static str,
    /// Download host, used for mirror prefetch.
    pub download: &'static str,
    /// Object management host (stat, chgm, move, batch, ...).
    pub object_manage: &'static str,
    /// Object enumeration host (`/list`).
    pub object_enum: &'static str,
    /// Query host (domains, async fetch).
    pub query: &'static str,
}

macro_rules! region {
    ($id:literal, $name:literal) => {
        region!($id, $name, $id)
    };
    ($id:literal, $name:literal, $host:literal) => {
        Region {
            id: $id,
            name: $name,
            bucket_manage: "uc.qiniuapi.com",
            upload: concat!("up-", $host, ".qiniup.com"),
            download: concat!("iovip-", $host, ".qiniuio.com"),
            object_manage: concat!("rs-", $host, ".qiniuapi.com"),
            object_enum: concat!("rsf-", $host, ".qiniuapi.com"),
            query: concat!("api-", $host, ".qiniuapi.com"),
        }
    };
}

// The legacy `zo` id maps to z0 hosts, except the query host which
// really is `api-zo`.
const REGIONS: &[Region] = &[
    Region {
        id: "zo",
        name: "华东-浙江",
        bucket_manage: "uc.qiniuapi.com",
        upload: "up-z0.qiniup.com",
        download: "iovip-z0.qiniuio.com",
        object_manage: "rs-z0.qiniuapi.com",
        object_enum: "rsf-z0.qiniuapi.com",
        query: "api-zo.qiniuapi.com",
    },
    region!("cn-east-2", "华东-浙江2"),
    region!("z1", "华北-河北"),
    region!("z2", "华南-广东"),
    region!("na0", "北美-洛杉矶"),
    region!("as0", "亚太-新加坡"),
    region!("ap-southeast-2", "亚太-河内"),
    region!("ap-southeast-3", "亚太-胡志明"),
];

/// All known regions.
pub fn all() -> &'static [Region] {
    REGIONS
}

pub(crate) fn lookup(id: &str) -> Option<&'static Region> {
    REGIONS.iter().find(|r| r.id == id)
}

/// Look up a caller-supplied region id.
pub fn find(id: &str) -> Result<&'static Region> {
    lookup(id).ok_or_else(|| Error::argument_invalid(format!("Unknown region Id {id}")))
}

/// Look up the region id taken from the configuration.
pub(crate) fn from_config(id: &str) -> Result<&'static Region> {
    lookup(id).ok_or_else(|| Error::config_invalid(format!("Unknown region Id {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_known_region() {
        let region = find("z1").unwrap();
        assert_eq!(region.upload, "up-z1.qiniup.com");
        assert_eq!(region.object_enum, "rsf-z1.qiniuapi.com");
        assert_eq!(region.bucket_manage, "uc.qiniuapi.com");
    }

    #[test]
    fn test_legacy_zo_mixes_z0_hosts() {
        let region = find("zo").unwrap();
        assert_eq!(region.upload, "up-z0.qiniup.com");
        assert_eq!(region.query, "api-zo.qiniuapi.com");
    }

    #[test]
    fn test_unknown_region_kind_depends_on_source() {
        assert_eq!(find("z9").unwrap_err().kind(), ErrorKind::ArgumentInvalid);
        assert_eq!(from_config("z9").unwrap_err().kind(), ErrorKind::ConfigInvalid);
    }
}
