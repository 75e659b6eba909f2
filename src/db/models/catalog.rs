//! Fixed reference data offered by the student forms.
//!
//! Submissions are checked against these lists, so a block, time slot,
//! appliance or store item that is not listed here is rejected.

use serde::Serialize;
use utoipa::ToSchema;

pub static HOSTEL_BLOCKS: [&str; 4] = ["Block A", "Block B", "Block C", "Block D"];

pub static TIME_SLOTS: [&str; 9] = [
    "08:00 AM", "09:00 AM", "10:00 AM", "11:00 AM", "12:00 PM", "02:00 PM", "03:00 PM",
    "04:00 PM", "05:00 PM",
];

#[derive(Serialize, Debug, Clone, Copy, ToSchema)]
pub struct Appliance {
    pub value: &'static str,
    pub label: &'static str,
}

pub static APPLIANCES: [Appliance; 6] = [
    Appliance { value: "Fan", label: "Fan" },
    Appliance { value: "Light", label: "Light / Tube Light" },
    Appliance { value: "AC", label: "Air Conditioner" },
    Appliance { value: "Geyser", label: "Geyser / Water Heater" },
    Appliance { value: "Plug Point", label: "Plug Point / Socket" },
    Appliance { value: "Other", label: "Other" },
];

#[derive(Serialize, Debug, Clone, Copy, ToSchema)]
pub struct StoreItem {
    pub name: &'static str,
    /// Price in rupees.
    pub price: u32,
}

#[derive(Serialize, Debug, Clone, Copy, ToSchema)]
pub struct StoreCategory {
    pub name: &'static str,
    #[schema(value_type = Vec<StoreItem>)]
    pub items: &'static [StoreItem],
}

pub static STORE_CATEGORIES: [StoreCategory; 3] = [
    StoreCategory {
        name: "Stationery",
        items: &[
            StoreItem { name: "Notebook (200 pages)", price: 60 },
            StoreItem { name: "Pen Set (Pack of 5)", price: 50 },
            StoreItem { name: "File Folder", price: 30 },
            StoreItem { name: "Highlighters (Pack of 4)", price: 80 },
            StoreItem { name: "Sticky Notes", price: 40 },
            StoreItem { name: "Stapler", price: 120 },
        ],
    },
    StoreCategory {
        name: "Fruits",
        items: &[
            StoreItem { name: "Apples (1 kg)", price: 180 },
            StoreItem { name: "Bananas (1 dozen)", price: 60 },
            StoreItem { name: "Oranges (1 kg)", price: 120 },
            StoreItem { name: "Grapes (500g)", price: 100 },
            StoreItem { name: "Pomegranate (2 pcs)", price: 150 },
            StoreItem { name: "Mixed Fruit Bowl", price: 200 },
        ],
    },
    StoreCategory {
        name: "Gym Supplements",
        items: &[
            StoreItem { name: "Protein Bar (Pack of 6)", price: 450 },
            StoreItem { name: "Energy Drink (500ml)", price: 80 },
            StoreItem { name: "Peanut Butter (500g)", price: 320 },
            StoreItem { name: "Protein Shake Mix", price: 1200 },
            StoreItem { name: "BCAA Powder", price: 900 },
            StoreItem { name: "Multivitamin (30 tablets)", price: 350 },
        ],
    },
];

#[derive(Serialize, Debug, ToSchema)]
pub struct Catalog {
    pub hostel_blocks: Vec<&'static str>,
    pub time_slots: Vec<&'static str>,
    pub appliances: Vec<Appliance>,
    pub store_categories: Vec<StoreCategory>,
}

impl Catalog {
    pub fn current() -> Self {
        Catalog {
            hostel_blocks: HOSTEL_BLOCKS.to_vec(),
            time_slots: TIME_SLOTS.to_vec(),
            appliances: APPLIANCES.to_vec(),
            store_categories: STORE_CATEGORIES.to_vec(),
        }
    }
}

pub fn is_hostel_block(block: &str) -> bool {
    HOSTEL_BLOCKS.contains(&block)
}

pub fn is_time_slot(slot: &str) -> bool {
    TIME_SLOTS.contains(&slot)
}

pub fn is_appliance(value: &str) -> bool {
    APPLIANCES.iter().any(|a| a.value == value)
}

pub fn store_category(name: &str) -> Option<&'static StoreCategory> {
    STORE_CATEGORIES.iter().find(|c| c.name == name)
}

impl StoreCategory {
    pub fn has_item(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name == name)
    }
}
