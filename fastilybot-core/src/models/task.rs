//! Task registry: the numeric IDs used on the command line and in the crontab

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which table a task ID belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Bot,
    Report,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Bot => write!(f, "bot"),
            TaskKind::Report => write!(f, "report"),
        }
    }
}

/// Result of resolving an ID against a task table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    Active(T),
    Retired,
    Unknown,
}

/// Bot tasks, which edit the wiki
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotTask {
    MtcClerk,
    RemoveBadMtc,
    UntagUnorphanedImages,
    FindLicenseConflicts,
    DatedDeletionNotifier,
    FlagFilesNominatedForDeletionOnCommons,
    FindDeletedOnCommons,
    FlagFilesSavedFromDeletionOnCommons,
    FlagOrphanedFreeImages,
    DateNowCommons,
    FfdNotifier,
}

impl BotTask {
    pub const ALL: [BotTask; 11] = [
        BotTask::MtcClerk,
        BotTask::RemoveBadMtc,
        BotTask::UntagUnorphanedImages,
        BotTask::FindLicenseConflicts,
        BotTask::DatedDeletionNotifier,
        BotTask::FlagFilesNominatedForDeletionOnCommons,
        BotTask::FindDeletedOnCommons,
        BotTask::FlagFilesSavedFromDeletionOnCommons,
        BotTask::FlagOrphanedFreeImages,
        BotTask::DateNowCommons,
        BotTask::FfdNotifier,
    ];

    pub const RETIRED: [u32; 1] = [3];

    pub fn id(self) -> u32 {
        match self {
            BotTask::MtcClerk => 1,
            BotTask::RemoveBadMtc => 2,
            BotTask::UntagUnorphanedImages => 4,
            BotTask::FindLicenseConflicts => 5,
            BotTask::DatedDeletionNotifier => 6,
            BotTask::FlagFilesNominatedForDeletionOnCommons => 7,
            BotTask::FindDeletedOnCommons => 8,
            BotTask::FlagFilesSavedFromDeletionOnCommons => 9,
            BotTask::FlagOrphanedFreeImages => 10,
            BotTask::DateNowCommons => 11,
            BotTask::FfdNotifier => 12,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BotTask::MtcClerk => "mtc_clerk",
            BotTask::RemoveBadMtc => "remove_bad_mtc",
            BotTask::UntagUnorphanedImages => "untag_unorphaned_images",
            BotTask::FindLicenseConflicts => "find_license_conflicts",
            BotTask::DatedDeletionNotifier => "dated_deletion_notifier",
            BotTask::FlagFilesNominatedForDeletionOnCommons => {
                "flag_files_nominated_for_deletion_on_commons"
            }
            BotTask::FindDeletedOnCommons => "find_deleted_on_commons",
            BotTask::FlagFilesSavedFromDeletionOnCommons => {
                "flag_files_saved_from_deletion_on_commons"
            }
            BotTask::FlagOrphanedFreeImages => "flag_orphaned_free_images",
            BotTask::DateNowCommons => "date_now_commons",
            BotTask::FfdNotifier => "ffd_notifier",
        }
    }

    pub fn lookup(id: u32) -> Lookup<Self> {
        if let Some(task) = Self::ALL.iter().find(|t| t.id() == id) {
            Lookup::Active(*task)
        } else if Self::RETIRED.contains(&id) {
            Lookup::Retired
        } else {
            Lookup::Unknown
        }
    }
}

/// Report tasks, which regenerate a database report page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportTask {
    ShadowsCommonsPage,
    OrphanedFilesForDiscussion,
    AllFreeLicenseTags,
    OrphanedTimedText,
    MalformedSpiReports,
    OrphanedKeepLocal,
    OversizedFairUseFiles,
    MissingFileCopyrightTags,
    DuplicateOnCommons,
    LowResolutionFreeFiles,
    PossiblyUnsourcedFiles,
    ImpossibleDailyDeletion,
    ShadowsCommonsNonFree,
    NonFreePdfs,
    OrphanedFileTalk,
    OrphanedPdfs,
    TranscludedNonExistentTemplates,
    FlickrFiles,
    LargeIpTalkPages,
    LargeUserTalkPages,
    MultiExtFilenames,
    GettyFiles,
    ApFiles,
    UnfiledRfas,
    FullyProtectedUserTalk,
    OrphanedKeepLocalWithCommonsDuplicate,
}

impl ReportTask {
    pub const ALL: [ReportTask; 26] = [
        ReportTask::ShadowsCommonsPage,
        ReportTask::OrphanedFilesForDiscussion,
        ReportTask::AllFreeLicenseTags,
        ReportTask::OrphanedTimedText,
        ReportTask::MalformedSpiReports,
        ReportTask::OrphanedKeepLocal,
        ReportTask::OversizedFairUseFiles,
        ReportTask::MissingFileCopyrightTags,
        ReportTask::DuplicateOnCommons,
        ReportTask::LowResolutionFreeFiles,
        ReportTask::PossiblyUnsourcedFiles,
        ReportTask::ImpossibleDailyDeletion,
        ReportTask::ShadowsCommonsNonFree,
        ReportTask::NonFreePdfs,
        ReportTask::OrphanedFileTalk,
        ReportTask::OrphanedPdfs,
        ReportTask::TranscludedNonExistentTemplates,
        ReportTask::FlickrFiles,
        ReportTask::LargeIpTalkPages,
        ReportTask::LargeUserTalkPages,
        ReportTask::MultiExtFilenames,
        ReportTask::GettyFiles,
        ReportTask::ApFiles,
        ReportTask::UnfiledRfas,
        ReportTask::FullyProtectedUserTalk,
        ReportTask::OrphanedKeepLocalWithCommonsDuplicate,
    ];

    pub const RETIRED: [u32; 1] = [7];

    /// Highest report ID, the upper bound of `--all-reports`
    pub const MAX_ID: u32 = 27;

    pub fn id(self) -> u32 {
        match self {
            ReportTask::ShadowsCommonsPage => 1,
            ReportTask::OrphanedFilesForDiscussion => 2,
            ReportTask::AllFreeLicenseTags => 3,
            ReportTask::OrphanedTimedText => 4,
            ReportTask::MalformedSpiReports => 5,
            ReportTask::OrphanedKeepLocal => 6,
            ReportTask::OversizedFairUseFiles => 8,
            ReportTask::MissingFileCopyrightTags => 9,
            ReportTask::DuplicateOnCommons => 10,
            ReportTask::LowResolutionFreeFiles => 11,
            ReportTask::PossiblyUnsourcedFiles => 12,
            ReportTask::ImpossibleDailyDeletion => 13,
            ReportTask::ShadowsCommonsNonFree => 14,
            ReportTask::NonFreePdfs => 15,
            ReportTask::OrphanedFileTalk => 16,
            ReportTask::OrphanedPdfs => 17,
            ReportTask::TranscludedNonExistentTemplates => 18,
            ReportTask::FlickrFiles => 19,
            ReportTask::LargeIpTalkPages => 20,
            ReportTask::LargeUserTalkPages => 21,
            ReportTask::MultiExtFilenames => 22,
            ReportTask::GettyFiles => 23,
            ReportTask::ApFiles => 24,
            ReportTask::UnfiledRfas => 25,
            ReportTask::FullyProtectedUserTalk => 26,
            ReportTask::OrphanedKeepLocalWithCommonsDuplicate => 27,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ReportTask::ShadowsCommonsPage => "shadows_commons_page",
            ReportTask::OrphanedFilesForDiscussion => "orphaned_files_for_discussion",
            ReportTask::AllFreeLicenseTags => "all_free_license_tags",
            ReportTask::OrphanedTimedText => "orphaned_timed_text",
            ReportTask::MalformedSpiReports => "malformed_spi_reports",
            ReportTask::OrphanedKeepLocal => "orphaned_keep_local",
            ReportTask::OversizedFairUseFiles => "oversized_fair_use_files",
            ReportTask::MissingFileCopyrightTags => "missing_file_copyright_tags",
            ReportTask::DuplicateOnCommons => "duplicate_on_commons",
            ReportTask::LowResolutionFreeFiles => "low_resolution_free_files",
            ReportTask::PossiblyUnsourcedFiles => "possibly_unsourced_files",
            ReportTask::ImpossibleDailyDeletion => "impossible_daily_deletion",
            ReportTask::ShadowsCommonsNonFree => "shadows_commons_non_free",
            ReportTask::NonFreePdfs => "non_free_pdfs",
            ReportTask::OrphanedFileTalk => "orphaned_file_talk",
            ReportTask::OrphanedPdfs => "orphaned_pdfs",
            ReportTask::TranscludedNonExistentTemplates => "transcluded_non_existent_templates",
            ReportTask::FlickrFiles => "flickr_files",
            ReportTask::LargeIpTalkPages => "large_ip_talk_pages",
            ReportTask::LargeUserTalkPages => "large_user_talk_pages",
            ReportTask::MultiExtFilenames => "multi_ext_filenames",
            ReportTask::GettyFiles => "getty_files",
            ReportTask::ApFiles => "ap_files",
            ReportTask::UnfiledRfas => "unfiled_rfas",
            ReportTask::FullyProtectedUserTalk => "fully_protected_user_talk",
            ReportTask::OrphanedKeepLocalWithCommonsDuplicate => {
                "orphaned_keep_local_with_commons_duplicate"
            }
        }
    }

    pub fn lookup(id: u32) -> Lookup<Self> {
        if let Some(task) = Self::ALL.iter().find(|t| t.id() == id) {
            Lookup::Active(*task)
        } else if Self::RETIRED.contains(&id) {
            Lookup::Retired
        } else {
            Lookup::Unknown
        }
    }
}

/// Parses the task list arguments into the IDs to process. `do_all` takes precedence over
/// `individual` and expands to `1..=total_ids`.
pub fn determine_tasks(individual: &[u32], do_all: bool, total_ids: u32) -> Vec<u32> {
    if do_all {
        (1..=total_ids).collect()
    } else {
        individual.to_vec()
    }
}
