//! Built-in field catalogue for technician service reports.
//!
//! The catalogue is plain data: a run configuration may replace it entirely.
//! Aliases only list wording variants; bold markers and the position of the
//! trailing `:`/`?` are handled by the matcher and need no alias of their own.

use crate::types::{FieldRequirement, FieldSet};

impl FieldSet {
    /// The seven required fields of a service report, with the alternative
    /// labels seen in real reports.
    ///
    /// # Examples
    ///
    /// ```
    /// use report_sorter_core::FieldSet;
    ///
    /// let fields = FieldSet::service_report();
    /// assert_eq!(fields.required().count(), 7);
    /// assert!(fields.find("Next steps?").is_some());
    /// ```
    pub fn service_report() -> Self {
        Self::new(vec![
            FieldRequirement::required("Date of service").with_aliases([
                "Service date",
                "Date",
                "Date of visit",
            ]),
            FieldRequirement::required("Technician name").with_aliases([
                "Technician",
                "Tech name",
                "Service technician",
            ]),
            FieldRequirement::required("Customer point of contact").with_aliases([
                "Customer points of contact",
                "Client contact",
                "Contact person",
                "Point of contact",
                "Customer contact",
            ]),
            FieldRequirement::required("Description of problem").with_aliases([
                "Description of problems",
                "Descriptions of problems",
                "Description of problems/requests",
                "Problems and requests",
                "Issues reported",
                "Problems encountered",
                "Service request",
                "Reported issue(s)",
            ]),
            FieldRequirement::required("Description of work performed").with_aliases([
                "Work performed",
                "Service performed",
                "Actions taken",
                "Work completed",
            ]),
            FieldRequirement::required("Issue resolved?").with_aliases([
                "Issues resolved?",
                "Issue(s) resolved?",
                "Problem resolved?",
                "Resolution status",
                "Resolved?",
            ]),
            FieldRequirement::required("Next steps?").with_aliases([
                "Future actions",
                "Follow-up required",
                "Follow-up actions",
                "Recommended next steps",
            ]),
        ])
    }
}
