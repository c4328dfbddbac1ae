use super::{collect, set_field};
use crate::models::{Document, GalleryItem, TimelineItem};
use crate::workflow::{ItemTarget, UploadOutcome};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DraftError {
    #[error("There is no {list} item #{index}.")]
    NoSuchItem { list: &'static str, index: usize },
    #[error("Unknown {list} field '{field}'.")]
    UnknownField { list: &'static str, field: String },
    #[error("Unknown upload target '{0}'.")]
    UnknownTarget(String),
    #[error("Unknown draft action '{0}'.")]
    UnknownAction(String),
}

/// Which ordered list an item operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemList {
    Timeline,
    Gallery,
}

impl ItemList {
    fn name(self) -> &'static str {
        match self {
            ItemList::Timeline => "timeline",
            ItemList::Gallery => "gallery",
        }
    }
}

/// An edit requested from the admin page besides plain field changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftAction {
    Append(ItemList),
    Remove(ItemList, usize),
    Move(ItemList, usize, usize),
}

impl DraftAction {
    /// Parses `timeline-add`, `gallery-remove-3`, `timeline-move-2-0`.
    pub fn parse(raw: &str) -> Result<DraftAction, DraftError> {
        let unknown = || DraftError::UnknownAction(raw.to_string());
        let parts: Vec<&str> = raw.split('-').collect();
        let index = |i: usize| parts[i].parse::<usize>().map_err(|_| unknown());
        let list = match parts[0] {
            "timeline" => ItemList::Timeline,
            "gallery" => ItemList::Gallery,
            _ => return Err(unknown()),
        };
        match parts[1..] {
            ["add"] => Ok(DraftAction::Append(list)),
            ["remove", _] => Ok(DraftAction::Remove(list, index(2)?)),
            ["move", _, _] => Ok(DraftAction::Move(list, index(2)?, index(3)?)),
            _ => Err(unknown()),
        }
    }
}

/// The admin's in-memory working copy of the document. Edits stay here until
/// an explicit save; a failed save leaves them in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentDraft {
    document: Document,
    dirty: bool,
}

impl ContentDraft {
    pub fn new(document: Document) -> Self {
        ContentDraft { document, dirty: false }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// True when the draft holds edits that were not saved yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn timeline(&self) -> &[TimelineItem] {
        self.document.timeline.as_deref().unwrap_or_default()
    }

    pub fn gallery(&self) -> &[GalleryItem] {
        self.document.gallery.as_deref().unwrap_or_default()
    }

    pub fn append_timeline(&mut self) -> usize {
        let items = self.document.timeline.get_or_insert_with(Vec::new);
        items.push(TimelineItem { title: "New Event".to_string(), ..Default::default() });
        self.dirty = true;
        items.len() - 1
    }

    pub fn append_gallery(&mut self) -> usize {
        let items = self.document.gallery.get_or_insert_with(Vec::new);
        items.push(GalleryItem::default());
        self.dirty = true;
        items.len() - 1
    }

    pub fn remove_timeline(&mut self, index: usize) -> Result<TimelineItem, DraftError> {
        let items = self.document.timeline.get_or_insert_with(Vec::new);
        if index >= items.len() {
            return Err(DraftError::NoSuchItem { list: "timeline", index });
        }
        self.dirty = true;
        Ok(items.remove(index))
    }

    pub fn remove_gallery(&mut self, index: usize) -> Result<GalleryItem, DraftError> {
        let items = self.document.gallery.get_or_insert_with(Vec::new);
        if index >= items.len() {
            return Err(DraftError::NoSuchItem { list: "gallery", index });
        }
        self.dirty = true;
        Ok(items.remove(index))
    }

    pub fn edit_timeline(&mut self, index: usize, field: &str, value: &str) -> Result<(), DraftError> {
        let item = self
            .document
            .timeline
            .as_mut()
            .and_then(|items| items.get_mut(index))
            .ok_or(DraftError::NoSuchItem { list: "timeline", index })?;
        let slot = match field {
            "title" => &mut item.title,
            "date" => &mut item.date,
            "description" => &mut item.description,
            "imageUrl" => &mut item.image_url,
            other => return Err(DraftError::UnknownField { list: "timeline", field: other.to_string() }),
        };
        if slot != value {
            *slot = value.to_string();
            self.dirty = true;
        }
        Ok(())
    }

    pub fn edit_gallery(&mut self, index: usize, field: &str, value: &str) -> Result<(), DraftError> {
        let item = self
            .document
            .gallery
            .as_mut()
            .and_then(|items| items.get_mut(index))
            .ok_or(DraftError::NoSuchItem { list: "gallery", index })?;
        let slot = match field {
            "caption" => &mut item.caption,
            "imageUrl" => &mut item.image_url,
            other => return Err(DraftError::UnknownField { list: "gallery", field: other.to_string() }),
        };
        if slot != value {
            *slot = value.to_string();
            self.dirty = true;
        }
        Ok(())
    }

    /// Moves an item so that it ends up at index `to`.
    pub fn move_item(&mut self, list: ItemList, from: usize, to: usize) -> Result<(), DraftError> {
        fn shift<T>(items: &mut Vec<T>, list: ItemList, from: usize, to: usize) -> Result<(), DraftError> {
            for index in [from, to] {
                if index >= items.len() {
                    return Err(DraftError::NoSuchItem { list: list.name(), index });
                }
            }
            let item = items.remove(from);
            items.insert(to, item);
            Ok(())
        }
        match list {
            ItemList::Timeline => shift(self.document.timeline.get_or_insert_with(Vec::new), list, from, to)?,
            ItemList::Gallery => shift(self.document.gallery.get_or_insert_with(Vec::new), list, from, to)?,
        }
        if from != to {
            self.dirty = true;
        }
        Ok(())
    }

    pub fn apply(&mut self, action: DraftAction) -> Result<(), DraftError> {
        match action {
            DraftAction::Append(ItemList::Timeline) => {
                self.append_timeline();
            }
            DraftAction::Append(ItemList::Gallery) => {
                self.append_gallery();
            }
            DraftAction::Remove(ItemList::Timeline, index) => {
                self.remove_timeline(index)?;
            }
            DraftAction::Remove(ItemList::Gallery, index) => {
                self.remove_gallery(index)?;
            }
            DraftAction::Move(list, from, to) => self.move_item(list, from, to)?,
        }
        Ok(())
    }

    /// Folds a submitted admin form into the draft: every bound field via the
    /// field table, plus `timeline-<i>-<field>` / `gallery-<i>-<field>` inputs.
    pub fn apply_form(&mut self, form: &HashMap<String, String>) {
        for (key, value) in form {
            let mut parts = key.splitn(3, '-');
            let (Some(list), Some(index), Some(field)) = (parts.next(), parts.next(), parts.next()) else {
                continue;
            };
            let Ok(index) = index.parse::<usize>() else { continue };
            let result = match list {
                "timeline" => self.edit_timeline(index, field, value),
                "gallery" => self.edit_gallery(index, field, value),
                _ => continue,
            };
            if let Err(e) = result {
                log::warn!("Ignoring form input '{}': {}", key, e);
            }
        }

        let collected = collect(form, &self.document);
        if collected != self.document {
            self.document = collected;
            self.dirty = true;
        }
    }

    /// Writes a finished upload's URL into the field it was bound to.
    pub fn apply_upload(&mut self, outcome: &UploadOutcome) -> Result<(), DraftError> {
        match ItemTarget::parse(&outcome.target) {
            Some(ItemTarget::Timeline(index)) => self.edit_timeline(index, "imageUrl", &outcome.url)?,
            Some(ItemTarget::Gallery(index)) => self.edit_gallery(index, "imageUrl", &outcome.url)?,
            None => {
                if !set_field(&mut self.document, &outcome.target, &outcome.url) {
                    return Err(DraftError::UnknownTarget(outcome.target.clone()));
                }
                self.dirty = true;
            }
        }
        Ok(())
    }

    /// Called after a successful save: the stored document now equals the draft.
    pub fn mark_saved(&mut self, saved: Document) {
        self.document = saved;
        self.dirty = false;
    }
}
