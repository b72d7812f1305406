use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::delegation::DelegationView;

/// How a descriptive column is coerced when read from a spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Rendered as a number with two decimals.
    Currency,
    /// Normalized to `YYYY-MM-DD` when recognizable.
    Date,
}

macro_rules! descriptive_fields {
    ($( $field:ident : $label:literal => $kind:ident ),* $(,)?) => {
        /// Descriptive attributes of an application. Opaque to the workflow;
        /// every field is optional so the same struct serves as a sparse update.
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
        pub struct ApplicationDetails {
            $(
                #[serde(default)]
                pub $field: Option<String>,
            )*
        }

        impl ApplicationDetails {
            /// `(column, label, kind)` for every descriptive column, in table order.
            pub const FIELDS: &'static [(&'static str, &'static str, FieldKind)] = &[
                $( (stringify!($field), $label, FieldKind::$kind), )*
            ];

            /// Columns that carry a value, paired with it.
            pub fn provided(&self) -> Vec<(&'static str, &str)> {
                let mut out = Vec::new();
                $(
                    if let Some(v) = self.$field.as_deref() {
                        out.push((stringify!($field), v));
                    }
                )*
                out
            }

            pub fn get(&self, column: &str) -> Option<&str> {
                match column {
                    $( stringify!($field) => self.$field.as_deref(), )*
                    _ => None,
                }
            }

            /// Returns false when `column` is not a descriptive column.
            pub fn set(&mut self, column: &str, value: Option<String>) -> bool {
                match column {
                    $( stringify!($field) => { self.$field = value; true } )*
                    _ => false,
                }
            }
        }
    };
}

descriptive_fields! {
    est_cat: "Establishment Category" => Text,
    est_lto_comp: "LTO Company" => Text,
    est_lto_add: "LTO Address" => Text,
    est_eadd: "Establishment Email" => Text,
    est_tin: "Establishment TIN" => Text,
    est_contact_no: "Contact Number" => Text,
    est_lto_no: "LTO Number" => Text,
    est_validity: "LTO Validity" => Date,
    prod_br_name: "Brand Name" => Text,
    prod_gen_name: "Generic Name" => Text,
    prod_dos_str: "Dosage Strength" => Text,
    prod_dos_form: "Dosage Form" => Text,
    prod_class_prescrip: "Prescription Class" => Text,
    prod_ess_drug_list: "Essential Drug List" => Text,
    prod_pharma_cat: "Pharmacologic Category" => Text,
    prod_manu: "Manufacturer" => Text,
    prod_manu_add: "Manufacturer Address" => Text,
    prod_manu_tin: "Manufacturer TIN" => Text,
    prod_manu_lto_no: "Manufacturer LTO Number" => Text,
    prod_manu_country: "Manufacturer Country" => Text,
    prod_trader: "Trader" => Text,
    prod_trader_add: "Trader Address" => Text,
    prod_trader_tin: "Trader TIN" => Text,
    prod_trader_lto_no: "Trader LTO Number" => Text,
    prod_trader_country: "Trader Country" => Text,
    prod_repacker: "Repacker" => Text,
    prod_repacker_add: "Repacker Address" => Text,
    prod_repacker_tin: "Repacker TIN" => Text,
    prod_repacker_lto_no: "Repacker LTO Number" => Text,
    prod_repacker_country: "Repacker Country" => Text,
    prod_importer: "Importer" => Text,
    prod_importer_add: "Importer Address" => Text,
    prod_importer_tin: "Importer TIN" => Text,
    prod_importer_lto_no: "Importer LTO Number" => Text,
    prod_importer_country: "Importer Country" => Text,
    prod_distri: "Distributor" => Text,
    prod_distri_add: "Distributor Address" => Text,
    prod_distri_tin: "Distributor TIN" => Text,
    prod_distri_lto_no: "Distributor LTO Number" => Text,
    prod_distri_country: "Distributor Country" => Text,
    prod_distri_shelf_life: "Shelf Life" => Text,
    storage_cond: "Storage Condition" => Text,
    packaging: "Packaging" => Text,
    sugg_rp: "Suggested Retail Price" => Currency,
    no_sample: "Number of Samples" => Text,
    expiry_date: "Expiry Date" => Date,
    cpr_validity: "CPR Validity" => Date,
    reg_no: "Registration Number" => Text,
    app_type: "Application Type" => Text,
    mother_app_type: "Mother Application Type" => Text,
    old_rsn: "Old RSN" => Text,
    ammend1: "Amendment 1" => Text,
    ammend2: "Amendment 2" => Text,
    ammend3: "Amendment 3" => Text,
    prod_cat: "Product Category" => Text,
    certification: "Certification" => Text,
    fee: "Fee" => Currency,
    lrf: "LRF" => Currency,
    surc: "Surcharge" => Currency,
    total: "Total" => Currency,
    or_no: "OR Number" => Text,
    date_issued: "Date Issued" => Date,
    date_received_fdac: "Date Received FDAC" => Date,
    date_received_cent: "Date Received Central" => Date,
    mo: "MO" => Text,
    file: "File" => Text,
    secpa: "SECPA" => Text,
    secpa_exp_date: "SECPA Expiry Date" => Date,
    secpa_issued_on: "SECPA Issued On" => Date,
    decking_sched: "Decking Schedule" => Date,
    eval: "Eval" => Text,
    date_deck: "Date Decked" => Date,
    remarks_1: "Remarks" => Text,
    date_remarks: "Date of Remarks" => Date,
    class: "Classification" => Text,
    date_released: "Date Released" => Date,
    type_doc_released: "Type of Document Released" => Text,
    atta_released: "Attachment Released" => Text,
    cpr_cond: "CPR Condition" => Text,
    cpr_cond_remarks: "CPR Condition Remarks" => Text,
    cpr_cond_add_remarks: "CPR Condition Additional Remarks" => Text,
    app_status: "Application Status" => Text,
    app_remarks: "Application Remarks" => Text,
    pharma_prod_cat: "Pharmaceutical Product Category" => Text,
    pharma_prod_cat_label: "Pharmaceutical Product Category Label" => Text,
}

impl ApplicationDetails {
    pub fn field_kind(column: &str) -> Option<FieldKind> {
        Self::FIELDS
            .iter()
            .find(|(name, _, _)| *name == column)
            .map(|(_, _, kind)| *kind)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Application {
    pub id: i64,
    pub dtn: Option<i64>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub details: ApplicationDetails,
    pub is_in_pm: Option<i16>,
    pub trash: Option<String>,
    pub trash_date: Option<NaiveDateTime>,
    pub user_uploader: Option<String>,
    pub date_excel_upload: Option<NaiveDateTime>,
}

impl Application {
    pub fn is_active(&self) -> bool {
        self.trash.is_none()
    }
}

/// Body of create and update requests. Absent fields are left untouched on update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationInput {
    #[serde(default)]
    pub dtn: Option<i64>,
    #[serde(default)]
    pub is_in_pm: Option<i16>,
    #[serde(flatten)]
    pub details: ApplicationDetails,
}

impl ApplicationInput {
    pub fn is_empty(&self) -> bool {
        self.dtn.is_none() && self.is_in_pm.is_none() && self.details.provided().is_empty()
    }
}

/// Listing row: the application plus its workflow state.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationListItem {
    #[serde(flatten)]
    pub application: Application,
    pub is_decked: bool,
    pub delegation: Option<DelegationView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSummary {
    pub total: i64,
    pub by_status: Vec<LabelCount>,
    pub by_category: Vec<LabelCount>,
    pub by_stage: Vec<StageCount>,
    pub recent_uploads: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageCount {
    pub stage: crate::models::delegation::Stage,
    pub completed: i64,
}

/// Which received-date column an analytics count looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceivedAt {
    Fdac,
    Central,
}

impl ReceivedAt {
    pub fn column(self) -> &'static str {
        match self {
            ReceivedAt::Fdac => "date_received_fdac",
            ReceivedAt::Central => "date_received_cent",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceivedCounts {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub fdac: i64,
    pub central: i64,
}
