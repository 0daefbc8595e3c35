//! Frequently used page titles

/// Template titles
pub mod templates {
    pub const BOTS: &str = "Template:Bots";
    pub const COPY_TO_COMMONS: &str = "Template:Copy to Wikimedia Commons";
    pub const DELETED_ON_COMMONS: &str = "Template:Deleted on Commons";
    pub const DELETABLE_FILE: &str = "Template:Deletable file";
    pub const DELETION_TEMPLATE_TAG: &str = "Template:Deletion template tag";
    pub const FFD: &str = "Template:Ffd";
    pub const KEEP_LOCAL: &str = "Template:Keep local";
    pub const NOW_COMMONS: &str = "Template:Now Commons";
    pub const NOMINATED_FOR_DELETION_ON_COMMONS: &str =
        "Template:Nominated for deletion on Commons";
    pub const ORPHAN_IMAGE: &str = "Template:Orphan image";
    pub const SPI_CASE_STATUS: &str = "Template:SPI case status";
    pub const SPI_ARCHIVE_NOTICE: &str = "Template:SPI archive notice";
}

/// Category titles
pub mod categories {
    pub const COPY_TO_COMMONS_REVIEWED: &str =
        "Category:Copy to Wikimedia Commons reviewed by a human";
    pub const COPY_TO_COMMONS_INLINE_IDENTIFIED: &str =
        "Category:Copy to Wikimedia Commons (inline-identified)";
    pub const NOW_COMMONS_UNKNOWN_DATE: &str =
        "Category:Wikipedia files with the same name on Wikimedia Commons as of unknown date";
    pub const REVIEWED_ON_COMMONS: &str = "Category:Wikipedia files reviewed on Wikimedia Commons";
    pub const IMAGES_AVAILABLE_AS_SVG: &str = "Category:Wikipedia images available as SVG";
    pub const PROPOSED_FOR_DELETION: &str = "Category:All files proposed for deletion";
    pub const ORPHANED_TALK_NOT_SPEEDY: &str =
        "Category:Wikipedia orphaned talk pages that should not be speedily deleted";
}
