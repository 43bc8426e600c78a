use bridge_core::{Error, Result};

/// A public OSS region with its access endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    /// Region id used in signatures, e.g. `cn-hangzhou`.
    pub id: &'static str,
    /// Human readable name.
    pub name: &'static str,
    /// Endpoint reachable from the public internet.
    pub extranet_endpoint: &'static str,
    /// Endpoint reachable from Aliyun VPCs.
    pub internal_endpoint: &'static str,
}

macro_rules! region {
    ($id:literal, $name:literal) => {
        Region {
            id: $id,
            name: $name,
            extranet_endpoint: concat!("oss-", $id, ".aliyuncs.com"),
            internal_endpoint: concat!("oss-", $id, "-internal.aliyuncs.com"),
        }
    };
    ($id:literal, $name:literal, $host:literal) => {
        Region {
            id: $id,
            name: $name,
            extranet_endpoint: concat!("oss-", $host, ".aliyuncs.com"),
            internal_endpoint: concat!("oss-", $host, "-internal.aliyuncs.com"),
        }
    };
}

const REGIONS: &[Region] = &[
    region!("cn-hangzhou", "华东1（杭州）"),
    region!("cn-shanghai", "华东2（上海）"),
    region!("cn-nanjing", "华东5（南京-本地地域）"),
    region!("cn-fuzhou", "华东6（福州-本地地域）"),
    region!("cn-wuhan", "华中1（武汉-本地地域）", "cn-wuhan-lr"),
    region!("cn-qingdao", "华北1（青岛）"),
    region!("cn-beijing", "华北2（北京）"),
    region!("cn-zhangjiakou", "华北 3（张家口）"),
    region!("cn-huhehaote", "华北5（呼和浩特）"),
    region!("cn-wulanchabu", "华北6（乌兰察布）"),
    region!("cn-shenzhen", "华南1（深圳）"),
    region!("cn-heyuan", "华南2（河源）"),
    region!("cn-guangzhou", "华南3（广州）"),
    region!("cn-chengdu", "西南1（成都）"),
    region!("cn-hongkong", "中国香港"),
    region!("us-west-1", "美国（硅谷）"),
    region!("us-east-1", "美国（弗吉尼亚）"),
    region!("ap-northeast-1", "日本（东京）"),
    region!("ap-northeast-2", "韩国（首尔）"),
    region!("ap-southeast-1", "新加坡"),
    region!("ap-southeast-2", "澳大利亚（悉尼）"),
    region!("ap-southeast-3", "马来西亚（吉隆坡）"),
    region!("ap-southeast-5", "印度尼西亚（雅加达）"),
    region!("ap-southeast-6", "菲律宾（马尼拉）"),
    region!("ap-southeast-7", "泰国（曼谷）"),
    region!("ap-south-1", "印度（孟买）关停中"),
    region!("eu-central-1", "德国（法兰克福）"),
    region!("eu-west-1", "英国（伦敦）"),
    region!("me-east-1", "阿联酋（迪拜）"),
];

/// All known public regions.
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
        let region = find("cn-hangzhou").unwrap();
        assert_eq!(region.extranet_endpoint, "oss-cn-hangzhou.aliyuncs.com");
        assert_eq!(region.internal_endpoint, "oss-cn-hangzhou-internal.aliyuncs.com");
    }

    #[test]
    fn test_local_region_endpoint_differs_from_id() {
        let region = find("cn-wuhan").unwrap();
        assert_eq!(region.extranet_endpoint, "oss-cn-wuhan-lr.aliyuncs.com");
    }

    #[test]
    fn test_unknown_region_kind_depends_on_source() {
        assert_eq!(find("cn-nowhere").unwrap_err().kind(), ErrorKind::ArgumentInvalid);
        assert_eq!(
            from_config("cn-nowhere").unwrap_err().kind(),
            ErrorKind::ConfigInvalid
        );
    }
}
