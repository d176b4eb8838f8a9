use serde::{Deserialize, Serialize};

/// Purchase product type of asset packs in the shop.
pub const ASSET_PACK_PRODUCT_TYPE: &str = "asset-pack";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub value: u32,
    pub currency: String,
    pub stripe_price_id: String,
}

/// Commercial metadata of a purchasable pack, owned by the remote catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPackListingData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prices: Vec<Price>,
}

impl AssetPackListingData {
    pub fn price_reference(&self) -> Option<&str> {
        self.prices
            .first()
            .map(|price| price.stripe_price_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// A pack the user owns. Unlike the listing it carries content references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateAssetPack {
    pub id: String,
    pub name: String,
    pub tag: String,
    #[serde(default)]
    pub content: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAssetPack {
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub external_web_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAssetPacks {
    pub starter_packs: Vec<PublicAssetPack>,
}

impl PublicAssetPacks {
    pub fn find_by_tag(&self, tag: &str) -> Option<&PublicAssetPack> {
        self.starter_packs.iter().find(|pack| pack.tag == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetShortHeader {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPurchase {
    #[serde(default)]
    pub id: String,
    pub product_id: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

pub fn contains_product(purchases: &[UserPurchase], product_id: &str) -> bool {
    purchases
        .iter()
        .any(|purchase| purchase.product_id == product_id)
}

/// A pack opened in the store: either a public starter pack or an owned
/// private pack.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenedPack {
    Public(PublicAssetPack),
    Private(PrivateAssetPack),
}

impl OpenedPack {
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Public(_) => None,
            Self::Private(pack) => Some(&pack.id),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Public(pack) => &pack.tag,
            Self::Private(pack) => &pack.tag,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Public(pack) => &pack.name,
            Self::Private(pack) => &pack.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetPackKind {
    Private,
    Public,
    Unknown,
}

impl AssetPackKind {
    pub fn id(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
            Self::Unknown => "unknown",
        }
    }
}

/// Best-effort classification for telemetry. Presence in the catalogs is
/// checked rather than the record shape, so new backend fields do not
/// change the answer.
pub fn identify_asset_pack_kind(
    private_listings: Option<&[AssetPackListingData]>,
    public_packs: Option<&PublicAssetPacks>,
    pack: Option<&OpenedPack>,
) -> AssetPackKind {
    let Some(pack) = pack else {
        return AssetPackKind::Unknown;
    };

    if let (Some(id), Some(listings)) = (pack.id(), private_listings)
        && listings.iter().any(|listing| listing.id == id)
    {
        return AssetPackKind::Private;
    }
    if public_packs.is_some_and(|packs| packs.find_by_tag(pack.tag()).is_some()) {
        return AssetPackKind::Public;
    }
    AssetPackKind::Unknown
}
