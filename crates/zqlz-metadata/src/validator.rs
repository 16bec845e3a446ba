//! Cache validators for derived properties
//!
//! Some table properties are computed once and stored on the table itself,
//! outside any [`ObjectLookupCache`](crate::lazy::ObjectLookupCache). A
//! validator answers, without I/O, whether the stored value can be shown as
//! is or the caller should load it. It never loads anything itself.

/// Derived properties that carry a validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyId {
    PartitionInfo,
    RealRowCount,
}

/// Pure freshness check for one derived property of `T`
pub trait PropertyCacheValidator<T: ?Sized> {
    fn is_property_cached(&self, object: &T, property: PropertyId) -> bool;
}

/// Structural facts a partition-info validator looks at
pub trait PartitionInfoSource {
    fn is_partitioned(&self) -> bool;
    fn has_partition_info(&self) -> bool;
}

/// Partition info is authoritative only for partitioned tables that have
/// already loaded it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PartitionInfoValidator;

impl<T: PartitionInfoSource + ?Sized> PropertyCacheValidator<T> for PartitionInfoValidator {
    fn is_property_cached(&self, object: &T, _property: PropertyId) -> bool {
        object.is_partitioned() && object.has_partition_info()
    }
}

pub trait RowCountSource {
    fn has_real_row_count(&self) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealRowCountValidator;

impl<T: RowCountSource + ?Sized> PropertyCacheValidator<T> for RealRowCountValidator {
    fn is_property_cached(&self, object: &T, _property: PropertyId) -> bool {
        object.has_real_row_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flags {
        partitioned: bool,
        info: bool,
    }

    impl PartitionInfoSource for Flags {
        fn is_partitioned(&self) -> bool {
            self.partitioned
        }

        fn has_partition_info(&self) -> bool {
            self.info
        }
    }

    #[test]
    fn test_partition_info_truth_table() {
        let cases = [
            (false, false, false),
            (false, true, false),
            (true, false, false),
            (true, true, true),
        ];
        for (partitioned, info, expected) in cases {
            let flags = Flags { partitioned, info };
            assert_eq!(
                PartitionInfoValidator.is_property_cached(&flags, PropertyId::PartitionInfo),
                expected,
                "partitioned={partitioned} info={info}"
            );
        }
    }
}
