pub mod buckets;
pub mod cliff;
pub mod fields;
pub mod grant_form;
