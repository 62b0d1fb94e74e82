// src/classifiers/keywords.rs
//! Curated keyword sets. Every list is matched by substring, so an entry like
//! "减" also hits "满减". Keep entries specific enough that real merchant names
//! do not trip them.

/// Promotional terms, banner phrases and recurring ad merchants on result lists.
pub const AD_KEYWORDS: &[&str] = &[
    "高德红包", "优惠", "券", "领取", "满减", "折扣", "减",
    "刚刚浏览", "大家还在搜", "推荐", "榜单", "服务推荐",
    "扫街榜", "爆款", "精选", "新客", "满", "已领取",
    "鲜花上门配送", "上门配送", "配送服务", "买花榜",
    "鲜花配送", "送货上门", "配送推荐", "服务", "推荐商家",
    // sponsored compound phrases
    "场地布置", "气球派对", "开业花篮", "绿植",
    // chain-store ad suffixes
    "（昆明店）", "（成都店）", "（西安店）",
    "馨爱鲜花",
];

/// UI chrome and list furniture that is never a merchant name.
pub const EXCLUDED_KEYWORDS: &[&str] = &[
    "搜索", "导航", "路线", "附近", "更多", "分享", "收藏",
    "大家还在搜", "根据当前位置推荐", "附近更多", "查看",
    "去过", "想去", "人均", "公里", "km", "m",
];

/// Fragments of rating/review/registration badges (checked on short text only).
pub const TAG_KEYWORDS: &[&str] = &[
    "收录", "入驻", "营业", "评分", "评价", "超棒",
    "很好", "好", "分", "星", "人去过", "想去", "收藏",
];

/// Badge labels matched as whole text or as a suffix.
pub const TAG_SUFFIXES: &[&str] = &["收录", "入驻商家", "营业中", "评分", "评价"];

/// Administrative divisions (province, city, district, county, town, village).
pub const ADDRESS_ADMIN_KEYWORDS: &[&str] = &["区", "县", "市", "省", "镇", "乡", "村"];

/// Roads, lanes, buildings and unit numbers.
pub const ADDRESS_ROAD_KEYWORDS: &[&str] = &[
    "路", "街", "道", "巷", "弄", "里", "大棚", "棚", "号", "栋", "楼", "层", "室", "幢",
];

/// Distance and travel-time words.
pub const DISTANCE_KEYWORDS: &[&str] = &["公里", "km", "米", "m", "驾车", "步行", "分钟", "小时"];

/// Market-style place words. A short text naming a market once is a business name.
pub const SPECIAL_ADDRESS_KEYWORDS: &[&str] = &["大棚", "草莓地", "市场", "交易中心"];
pub const MARKET_NAME_KEYWORDS: &[&str] = &["市场", "交易中心"];

/// Explicit address label shown before addresses on cards.
pub const ADDRESS_LABEL: &str = "地址";

/// Words typical of product titles shown inside cards (bouquets, delivery blurbs).
pub const PRODUCT_KEYWORDS: &[&str] = &[
    "花束", "鲜花速递", "配送", "上门", "仅限", "不含",
    "指定", "全国", "实体店", "速递", "保证",
];

/// Road-ish characters used by the detail-page address heuristic.
pub const DETAIL_ADDRESS_KEYWORDS: &[&str] = &["区", "路", "街", "号", "道", "巷"];

/// Business status labels on the detail page.
pub const BUSINESS_STATUS_LABELS: &[&str] = &["营业中", "休息中", "即将营业", "已打烊", "暂停营业"];

/// Section labels on the detail page.
pub const DETAIL_PAGE_LABELS: &[&str] = &["入驻商家", "刚刚浏览", "达人笔记", "附近推荐", "查看全部"];

/// Phone affordance label, and the "supply a phone number" variant of it.
pub const PHONE_LABEL: &str = "电话";
pub const SUPPLY_PHONE_LABEL: &str = "补充电话";

/// Resource-identifier fragments (compared lowercase).
pub const ID_NAME_KEYWORDS: &[&str] = &["title", "name", "merchant", "shop"];
pub const ID_PHONE_KEYWORDS: &[&str] = &["phone", "tel", "call"];
pub const ID_ADDRESS_KEYWORDS: &[&str] = &["address", "location", "addr"];
pub const SYSTEM_ID_NAMESPACES: &[&str] = &["com.android.systemui:", "android:id/"];

// --- Page-state vocabulary ---

/// Ranked-nearby titles at the top of the result list.
pub const LIST_TITLE_KEYWORDS: &[&str] = &["附近上榜", "榜单", "推荐商家", "附近商家", "搜索结果"];
pub const FILTER_LABEL: &str = "筛选";
pub const SORT_LABEL: &str = "排序";

pub const NAVIGATION_KEYWORDS: &[&str] = &["导航", "路线"];

/// Top-right toolbar of the detail page. Latin variants are matched lowercase
/// against the accessibility description.
pub const SEARCH_BUTTON_KEYWORDS: &[&str] = &["搜索"];
pub const SEARCH_BUTTON_DESC_LATIN: &[&str] = &["search"];
pub const FEEDBACK_BUTTON_KEYWORDS: &[&str] = &["反馈"];
pub const FEEDBACK_BUTTON_DESC_ONLY: &[&str] = &["举报"];
pub const FEEDBACK_BUTTON_DESC_LATIN: &[&str] = &["feedback"];
pub const CLOSE_BUTTON_KEYWORDS: &[&str] = &["关闭", "更多"];
pub const CLOSE_BUTTON_DESC_LATIN: &[&str] = &["close", "more"];

/// Text that marks a sponsored landing page instead of a merchant detail page.
pub const AD_PAGE_KEYWORDS: &[&str] = &["推荐", "服务推荐", "上门配送", "配送服务"];

pub const DIALER_DIGIT_LABELS: &[&str] = &["1", "2"];
pub const DIALER_KEYWORDS: &[&str] = &["拨号", "通话", "呼叫", "联系人", "最近通话", "通讯录"];
/// Map-app vocabulary; present means we are still inside the map app.
pub const MAP_APP_KEYWORDS: &[&str] = &["商家", "导航", "路线", "地址", "详情"];

pub const SUPPLY_PHONE_KEYWORDS: &[&str] = &["补充电话", "暂无电话", "未提供电话", "添加电话"];

pub const END_OF_LIST_MARKERS: &[&str] = &["没有更多", "已经到底", "没有更多内容", "暂无更多", "到底了", "就这些了"];

/// Count of keywords contained in `text`.
pub fn count_hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}

pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_sets_have_no_blank_entries() {
        for set in [
            AD_KEYWORDS, EXCLUDED_KEYWORDS, TAG_KEYWORDS, TAG_SUFFIXES, ADDRESS_ADMIN_KEYWORDS,
            ADDRESS_ROAD_KEYWORDS, DISTANCE_KEYWORDS, SPECIAL_ADDRESS_KEYWORDS, PRODUCT_KEYWORDS,
            DIALER_KEYWORDS, MAP_APP_KEYWORDS, SUPPLY_PHONE_KEYWORDS, END_OF_LIST_MARKERS,
        ] {
            assert!(set.iter().all(|k| !k.trim().is_empty()));
        }
    }

    #[test]
    fn test_count_hits_is_substring_based() {
        assert_eq!(count_hits("满减优惠", AD_KEYWORDS), 4); // 满减, 减, 满, 优惠
        assert!(contains_any("配送服务", AD_KEYWORDS));
        assert!(!contains_any("老王花店", AD_KEYWORDS));
    }
}
