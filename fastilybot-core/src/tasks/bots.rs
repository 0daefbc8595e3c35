//! Bot tasks: maintenance edits to file description pages and uploader notifications

use super::constants::{categories, templates};
use super::context::{listify, sorted, template_param, Source, TaskContext};
use crate::models::BotTask;
use crate::wiki::{Edit, Namespace};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use regex::{NoExpand, Regex};
use std::collections::{BTreeMap, HashSet};

/// Midnight (UTC) of the day before `now`, and midnight of `now`
pub fn yesterday_and_today(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (today - Duration::days(1), today)
}

/// Runs bot tasks as the logged in user
pub struct Bots {
    ctx: TaskContext,
    username: String,
    now: DateTime<Utc>,
}

impl Bots {
    /// Configuration pages live under `User:<username>/Task/`
    pub fn new(ctx: TaskContext) -> Result<Self> {
        let username = ctx
            .wiki()
            .username()
            .context("Bot tasks require a logged in wiki client")?
            .to_string();
        let ctx = ctx.with_config_prefix(format!("User:{}/Task/", username));

        Ok(Self {
            ctx,
            username,
            now: Utc::now(),
        })
    }

    /// Pin the clock used for date dependent tasks
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    pub async fn run(&self, task: BotTask) -> Result<()> {
        match task {
            BotTask::MtcClerk => self.mtc_clerk().await,
            BotTask::RemoveBadMtc => self.remove_bad_mtc().await,
            BotTask::UntagUnorphanedImages => self.untag_unorphaned_images().await,
            BotTask::FindLicenseConflicts => self.find_license_conflicts().await,
            BotTask::DatedDeletionNotifier => self.dated_deletion_notifier().await,
            BotTask::FlagFilesNominatedForDeletionOnCommons => {
                self.flag_files_nominated_for_deletion_on_commons().await
            }
            BotTask::FindDeletedOnCommons => self.find_deleted_on_commons().await,
            BotTask::FlagFilesSavedFromDeletionOnCommons => {
                self.flag_files_saved_from_deletion_on_commons().await
            }
            BotTask::FlagOrphanedFreeImages => self.flag_orphaned_free_images().await,
            BotTask::DateNowCommons => self.date_now_commons().await,
            BotTask::FfdNotifier => self.ffd_notifier().await,
        }
    }

    /// `{{Now Commons}}` tag pointing at `commons_title`, dated today
    pub fn mtc_tag(&self, commons_title: &str) -> String {
        format!(
            "{{{{Now Commons|{}|date={}|bot={}}}}}",
            commons_title,
            self.now.format("%-d %B %Y"),
            self.username
        )
    }

    /// Task 1. Files tagged for transfer to Commons which already have a duplicate there get
    /// the transfer tag replaced with `{{Now Commons}}`.
    pub async fn mtc_clerk(&self) -> Result<()> {
        let ctx = &self.ctx;
        let wiki = ctx.wiki();

        let now_commons: HashSet<String> = ctx
            .transclusions(templates::NOW_COMMONS, &[])
            .await?
            .into_iter()
            .collect();
        let mtc_regex = ctx.template_regex(templates::COPY_TO_COMMONS).await?;

        let tagged: HashSet<String> = ctx
            .transclusions(templates::COPY_TO_COMMONS, &[Namespace::FILE])
            .await?
            .into_iter()
            .collect();
        let mut candidates = ctx.fetch_report(1, Namespace::FILE).await?;
        candidates.retain(|t| tagged.contains(t));

        let candidates = ctx
            .difference_of(&[
                Source::Titles(candidates),
                Source::page(templates::KEEP_LOCAL),
                Source::page(categories::COPY_TO_COMMONS_INLINE_IDENTIFIED),
            ])
            .await?;

        let duplicates: BTreeMap<String, String> = wiki
            .duplicate_files(&sorted(candidates), true)
            .await?
            .into_iter()
            .filter_map(|(title, dupes)| dupes.into_iter().next().map(|d| (title, d)))
            .collect();
        let titles: Vec<String> = duplicates.keys().cloned().collect();
        let texts = wiki.page_texts(&titles).await?;

        for (title, commons_title) in &duplicates {
            let Some(text) = texts.get(title) else {
                continue;
            };
            let stripped = mtc_regex.replace_all(text, "");
            if stripped == text.as_str() {
                continue;
            }

            let tag = if now_commons.contains(title) {
                String::new()
            } else {
                format!("{}\n", self.mtc_tag(commons_title))
            };
            wiki.edit(
                title,
                &Edit::replace(
                    format!("{}{}", tag, stripped),
                    "BOT: This file has already been copied to Commons",
                ),
            )
            .await?;
        }

        Ok(())
    }

    /// Task 2. Strip the transfer tag from files in blacklisted categories.
    pub async fn remove_bad_mtc(&self) -> Result<()> {
        let ctx = &self.ctx;

        let reviewed = ctx
            .category_members_recursive(categories::COPY_TO_COMMONS_REVIEWED)
            .await?;
        let eligible = ctx
            .difference_of(&[
                Source::page(templates::COPY_TO_COMMONS),
                Source::Titles(reviewed),
                Source::page(categories::COPY_TO_COMMONS_INLINE_IDENTIFIED),
            ])
            .await?;
        let mtc_regex = ctx.template_regex(templates::COPY_TO_COMMONS).await?;

        let mut targets = Vec::new();
        for category in ctx
            .wiki()
            .links_on_page(&ctx.config_of(2, "Blacklist"), &[])
            .await?
        {
            for member in ctx.category_members(&category, &[Namespace::FILE]).await? {
                if eligible.contains(&member) {
                    targets.push(member);
                }
            }
        }

        for title in sorted(targets.into_iter().collect::<HashSet<_>>()) {
            ctx.replace_text(
                &title,
                &mtc_regex,
                "",
                "BOT: This file does not appear to be eligible for Commons",
            )
            .await?;
        }
        Ok(())
    }

    /// Task 4. Remove `{{Orphan image}}` from free files which are used again.
    pub async fn untag_unorphaned_images(&self) -> Result<()> {
        let ctx = &self.ctx;
        let oi_regex = ctx.template_regex(templates::ORPHAN_IMAGE).await?;

        let free = ctx
            .difference_of(&[Source::report(3), Source::report(4)])
            .await?;
        let mut targets = ctx
            .difference_of(&[
                Source::report(9),
                Source::Titles(free),
                Source::page(templates::BOTS),
            ])
            .await?;
        let tagged = ctx.fetch_report(6, Namespace::FILE).await?;
        targets.retain(|t| tagged.contains(t));

        for title in sorted(targets) {
            ctx.replace_text(&title, &oi_regex, "", "BOT: File contains inbound links")
                .await?;
        }
        Ok(())
    }

    /// Task 5. Mark files labeled both free and non-free.
    pub async fn find_license_conflicts(&self) -> Result<()> {
        let ctx = &self.ctx;
        let targets = ctx
            .difference_of(&[Source::report(2), Source::page(ctx.ignore_of(5))])
            .await?;

        for title in sorted(targets) {
            ctx.wiki()
                .edit(
                    &title,
                    &Edit::prepend(
                        "{{Wrong-license}}\n",
                        "BOT: Marking conflict in copyright status",
                    ),
                )
                .await?;
        }
        Ok(())
    }

    /// Task 6. Notify uploaders of files nominated for dated deletion yesterday.
    ///
    /// The rules page is a JSON object mapping a root category to the talk page template to
    /// leave, e.g. `{"Category:Wikipedia files with unknown source": "Di-no source-notice"}`.
    pub async fn dated_deletion_notifier(&self) -> Result<()> {
        let ctx = &self.ctx;
        let wiki = ctx.wiki();

        let mut ignored = HashSet::new();
        for template in wiki.links_on_page(&ctx.ignore_of(6), &[]).await? {
            ignored.extend(wiki.what_transcludes_here(&template, &[]).await?);
        }

        let (yesterday, _) = yesterday_and_today(self.now);
        let target_suffix = yesterday.format("%-d %B %Y").to_string();

        let rules_page = ctx.config_of(6, "Rules");
        let rules: BTreeMap<String, String> =
            serde_json::from_str(&wiki.page_text(&rules_page).await?)
                .with_context(|| format!("Failed to parse rules on {}", rules_page))?;

        for (root_category, talk_template) in &rules {
            let target_category = wiki
                .category_members(root_category, &[Namespace::CATEGORY])
                .await?
                .into_iter()
                .find(|c| c.ends_with(&target_suffix));

            let Some(target_category) = target_category else {
                tracing::debug!(
                    category = %root_category,
                    date = %target_suffix,
                    "No subcategory matching yesterday's date"
                );
                continue;
            };

            let files = ctx
                .difference_of(&[
                    Source::page(target_category),
                    Source::Titles(ignored.clone()),
                ])
                .await?;
            self.file_notifier(talk_template, &sorted(files)).await?;
        }
        Ok(())
    }

    /// Task 7. Replace `{{Now Commons}}` with `{{Nominated for deletion on Commons}}` when the
    /// Commons duplicate has been nominated for deletion.
    pub async fn flag_files_nominated_for_deletion_on_commons(&self) -> Result<()> {
        let ctx = &self.ctx;
        let ncd_regex = ctx.template_regex(templates::NOW_COMMONS).await?;
        let nfdc_base = ctx.ns().strip_ns(templates::NOMINATED_FOR_DELETION_ON_COMMONS);

        let nominated = self.nominated_on_commons().await?;
        let tagged = ctx
            .transclusions(templates::NOW_COMMONS, &[Namespace::FILE])
            .await?;

        let duplicates = ctx.wiki().duplicate_files(&tagged, true).await?;
        for title in sorted(duplicates.keys().cloned()) {
            let Some(target) = duplicates[&title].iter().find(|d| nominated.contains(*d)) else {
                continue;
            };
            ctx.replace_text(
                &title,
                &ncd_regex,
                &format!("\n{{{{{}|{}}}}}", nfdc_base, ctx.ns().strip_ns(target)),
                "BOT: This file has been nominated for deletion on Commons",
            )
            .await?;
        }
        Ok(())
    }

    /// Task 8. Replace `{{Nominated for deletion on Commons}}` with `{{Deleted on Commons}}`
    /// once the Commons copy has been deleted.
    pub async fn find_deleted_on_commons(&self) -> Result<()> {
        let ctx = &self.ctx;
        let wiki = ctx.wiki();
        let ns = ctx.ns();
        let nfdc_regex = ctx
            .template_regex(templates::NOMINATED_FOR_DELETION_ON_COMMONS)
            .await?;
        let dc_title = ns.strip_ns(templates::DELETED_ON_COMMONS);

        let tagged = ctx
            .transclusions(templates::NOMINATED_FOR_DELETION_ON_COMMONS, &[Namespace::FILE])
            .await?;
        let texts = wiki.page_texts(&tagged).await?;

        // local file -> alleged commons copy
        let mut alleged = BTreeMap::new();
        for (title, text) in &texts {
            match nfdc_regex.find(text) {
                Some(m) => {
                    let target = template_param(m.as_str(), 1).unwrap_or_else(|| title.clone());
                    alleged.insert(title.clone(), target);
                }
                None => tracing::warn!(title = %title, "Could not parse text"),
            }
        }

        let raw: Vec<String> = alleged.values().cloned().collect();
        let normalized = wiki.normalize_titles(&raw).await?;
        let alleged: BTreeMap<String, String> = alleged
            .into_iter()
            .map(|(title, target)| {
                let target = normalized.get(&target).unwrap_or(&target);
                let target = ns.convert_ns(target, Namespace::FILE);
                (title, target)
            })
            .collect();

        let targets: Vec<String> = alleged.values().cloned().collect();
        let existing = TaskContext::exists_filter(ctx.commons(), &targets, true).await?;

        for (title, target) in &alleged {
            if existing.contains(target)
                || !ctx.commons().has_log_entry(target, "delete/delete").await?
            {
                continue;
            }

            let replacement = format!("\n{{{{{}|{}}}}}", dc_title, ns.strip_ns(target));
            let text = nfdc_regex.replace_all(&texts[title], NoExpand(&replacement));
            wiki.edit(
                title,
                &Edit::replace(text.into_owned(), "BOT: This file was deleted on Commons"),
            )
            .await?;
        }
        Ok(())
    }

    /// Task 9. Replace `{{Nominated for deletion on Commons}}` with `{{Now Commons}}` when the
    /// Commons duplicate is no longer nominated.
    pub async fn flag_files_saved_from_deletion_on_commons(&self) -> Result<()> {
        let ctx = &self.ctx;
        let nfdc_regex = ctx
            .template_regex(templates::NOMINATED_FOR_DELETION_ON_COMMONS)
            .await?;

        let nominated = self.nominated_on_commons().await?;
        let tagged = ctx
            .transclusions(templates::NOMINATED_FOR_DELETION_ON_COMMONS, &[Namespace::FILE])
            .await?;

        let duplicates = ctx.wiki().duplicate_files(&tagged, true).await?;
        for title in sorted(duplicates.keys().cloned()) {
            let dupes = &duplicates[&title];
            let Some(first) = dupes.first() else {
                continue;
            };
            if dupes.iter().any(|d| nominated.contains(d)) {
                continue;
            }

            ctx.replace_text(
                &title,
                &nfdc_regex,
                &format!(
                    "\n{{{{subst:{}|{}}}}}",
                    templates::NOW_COMMONS,
                    ctx.ns().strip_ns(first)
                ),
                "BOT: This file is no longer up for deletion on Commons",
            )
            .await?;
        }
        Ok(())
    }

    /// Task 10. Tag orphaned free files with `{{Orphan image}}`.
    pub async fn flag_orphaned_free_images(&self) -> Result<()> {
        let ctx = &self.ctx;
        let oi_title = ctx.ns().strip_ns(templates::ORPHAN_IMAGE);

        let candidates = ctx
            .difference_of(&[
                Source::report(3),
                Source::report(9),
                Source::page(templates::BOTS),
                Source::page(templates::DELETABLE_FILE),
                Source::report(4),
                Source::page(ctx.ignore_of(10)),
            ])
            .await?;
        let targets = TaskContext::exists_filter(ctx.wiki(), &sorted(candidates), true).await?;

        for title in sorted(targets) {
            ctx.wiki()
                .edit(
                    &title,
                    &Edit::append(
                        format!("\n{{{{{}}}}}", oi_title),
                        "BOT: this file has no inbound file usage",
                    ),
                )
                .await?;
        }
        Ok(())
    }

    /// Task 11. Fill in the date of `{{Now Commons}}` tags which lack one.
    pub async fn date_now_commons(&self) -> Result<()> {
        let ctx = &self.ctx;
        let ncd_regex = ctx.template_regex(templates::NOW_COMMONS).await?;
        let subst_ncd = format!(
            "\n{{{{subst:{}}}}}",
            ctx.ns().strip_ns(templates::NOW_COMMONS)
        );

        let undated = ctx
            .wiki()
            .category_members(categories::NOW_COMMONS_UNKNOWN_DATE, &[Namespace::FILE])
            .await?;
        let reviewed = ctx
            .category_members_recursive(categories::REVIEWED_ON_COMMONS)
            .await?;
        let targets = ctx
            .difference_of(&[Source::from(undated), Source::Titles(reviewed)])
            .await?;

        for title in sorted(targets) {
            ctx.replace_text(&title, &ncd_regex, &subst_ncd, "BOT: Dating Now Commons tag")
                .await?;
        }
        Ok(())
    }

    /// Task 12. Notify uploaders of files nominated at FfD yesterday.
    pub async fn ffd_notifier(&self) -> Result<()> {
        let ctx = &self.ctx;
        let wiki = ctx.wiki();

        let (yesterday, _) = yesterday_and_today(self.now);
        let target_suffix = yesterday.format("%Y %B %-d").to_string();
        let ffd_snippet = Regex::new(&format!(
            r"\|log\s*=\s*{}",
            regex::escape(&target_suffix)
        ))?;

        let nominated = wiki
            .links_on_page(
                &format!("Wikipedia:Files for discussion/{}", target_suffix),
                &[Namespace::FILE],
            )
            .await?;
        let texts = wiki.page_texts(&nominated).await?;
        let targets: Vec<String> = nominated
            .into_iter()
            .filter(|t| texts.get(t).is_some_and(|text| ffd_snippet.is_match(text)))
            .collect();

        self.file_notifier(&ctx.config_of(12, "Note"), &targets).await
    }

    /// Commons files transcluding the deletion template tag
    async fn nominated_on_commons(&self) -> Result<HashSet<String>> {
        Ok(self
            .ctx
            .commons_transclusions(templates::DELETION_TEMPLATE_TAG, &[Namespace::FILE])
            .await?
            .into_iter()
            .collect())
    }

    /// Leave `{{subst:<talk_template>|...}}` on the talk page of each file's uploader.
    ///
    /// Skips uploaders opted out with `{{Bots}}`, talk pages which are redirects, and files
    /// already linked from the talk page now or by an edit made since yesterday.
    async fn file_notifier(&self, talk_template: &str, titles: &[String]) -> Result<()> {
        let ctx = &self.ctx;
        let wiki = ctx.wiki();
        let ns = ctx.ns();
        let (yesterday, today) = yesterday_and_today(self.now);

        let mut by_uploader: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for title in titles {
            if let Some(uploader) = wiki.first_editor_of(title).await? {
                by_uploader
                    .entry(ns.convert_ns(&uploader, Namespace::USER_TALK))
                    .or_default()
                    .push(title.clone());
            }
        }

        let opted_out: HashSet<String> = ctx
            .transclusions(templates::BOTS, &[Namespace::USER_TALK])
            .await?
            .into_iter()
            .collect();
        by_uploader.retain(|talk, _| !opted_out.contains(talk));

        let talk_pages: Vec<String> = by_uploader.keys().cloned().collect();
        let redirects = wiki.resolve_redirects(&talk_pages).await?;
        by_uploader.retain(|talk, _| redirects.get(talk).map_or(true, |target| target == talk));

        let files: Vec<String> = by_uploader.values().flatten().cloned().collect();
        let backlinks = wiki.what_links_here(&files).await?;

        for (talk, uploads) in &by_uploader {
            let mut targets: Vec<&String> = uploads
                .iter()
                .filter(|f| !backlinks.get(*f).is_some_and(|links| links.contains(talk)))
                .collect();
            if targets.is_empty() {
                continue;
            }

            let mut recent = HashSet::new();
            for revid in wiki.revision_ids(talk, yesterday, today).await? {
                recent.extend(wiki.links_in_revision(revid).await?);
            }
            targets.retain(|f| !recent.contains(*f));

            let Some((first, rest)) = targets.split_first() else {
                continue;
            };
            let also = if rest.is_empty() {
                String::new()
            } else {
                listify(rest, true, "\n\nAlso:\n")
            };

            tracing::info!(talk = %talk, files = targets.len(), "Notifying uploader");
            wiki.edit(
                talk,
                &Edit::append(
                    format!(
                        "\n\n{{{{subst:{}|{}}}}}{}\n{{{{subst:User:FastilyBot/BotNote}}}}",
                        talk_template, first, also
                    ),
                    "BOT: Some of your file(s) may need attention",
                ),
            )
            .await?;
        }
        Ok(())
    }
}
