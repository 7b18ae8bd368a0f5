/// Identifier of a catalog voucher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoucherId(pub u32);

impl std::fmt::Display for VoucherId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "voucher-{}", self.0)
    }
}

/// One redeemable catalog entry. Static configuration, never mutated at
/// runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voucher {
    pub id: VoucherId,
    pub title: &'static str,
    /// Redemption cost in coins.
    pub cost: u64,
    /// Display tint as 0xRRGGBB, for client rendering only.
    pub tint: u32,
}

/// The fixed voucher catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoucherCatalog {
    vouchers: Vec<Voucher>,
}

impl VoucherCatalog {
    pub fn new(vouchers: Vec<Voucher>) -> Self {
        Self { vouchers }
    }

    pub fn get(&self, id: VoucherId) -> Option<&Voucher> {
        self.vouchers.iter().find(|v| v.id == id)
    }

    pub fn vouchers(&self) -> &[Voucher] {
        &self.vouchers
    }
}

impl Default for VoucherCatalog {
    fn default() -> Self {
        Self::new(vec![
            Voucher {
                id: VoucherId(1),
                title: "Coffee discount",
                cost: 50,
                tint: 0x6f4e37,
            },
            Voucher {
                id: VoucherId(2),
                title: "Bus ticket",
                cost: 100,
                tint: 0x2f6fde,
            },
            Voucher {
                id: VoucherId(3),
                title: "Plant a tree",
                cost: 150,
                tint: 0x2e8b57,
            },
            Voucher {
                id: VoucherId(4),
                title: "Reusable bottle",
                cost: 250,
                tint: 0x8a2be2,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_by_id() {
        let catalog = VoucherCatalog::default();
        let voucher = catalog.get(VoucherId(1)).unwrap();
        assert_eq!(voucher.cost, 50);
        assert!(catalog.get(VoucherId(99)).is_none());
    }
}
