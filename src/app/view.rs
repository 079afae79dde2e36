// src/app/view.rs
//! Application view rendering

use iced::widget::{
    Space, button, column, container, row, scrollable, stack, text, toggler,
};
use iced::{Alignment, Element, Fill, Padding};

use super::App;
use super::message::Message;
use crate::engine::CoordinatorPhase;
use crate::eq::{BAND_COUNT, EQ_FREQUENCIES, band_label};
use crate::render::Series;
use crate::ui::canvas::{Chart, chart};
use crate::ui::{theme, widgets};
use crate::utils::format_time;

const WAVEFORM_HEIGHT: f32 = 150.0;
const SPECTRUM_HEIGHT: f32 = 200.0;
const SPECTROGRAM_HEIGHT: f32 = 200.0;
const CURVE_HEIGHT: f32 = 160.0;
const SIDEBAR_WIDTH: f32 = 300.0;

impl App {
    /// Build the view for a specific window
    pub fn view(&self, _window_id: iced::window::Id) -> Element<'_, Message> {
        let charts = column![
            self.view_waveform(),
            self.view_spectrum(),
            self.view_spectrogram(),
        ]
        .spacing(12);

        let sidebar = column![self.view_equalizer(), self.view_playlist()]
            .spacing(12)
            .width(SIDEBAR_WIDTH);

        let body = row![
            scrollable(charts)
                .style(theme::dark_scrollable)
                .width(Fill)
                .height(Fill),
            sidebar,
        ]
        .spacing(12)
        .height(Fill);

        let main = container(
            column![self.view_header(), body, self.view_transport()]
                .spacing(12)
                .padding(16),
        )
        .width(Fill)
        .height(Fill)
        .style(theme::main_content);

        match &self.view.toast {
            Some(toast) => stack![
                main,
                container(widgets::view_toast(toast, Message::HideToast(toast.id)))
                    .width(Fill)
                    .height(Fill)
                    .align_x(Alignment::Center)
                    .align_y(Alignment::End)
                    .padding(Padding::new(0.0).bottom(96.0)),
            ]
            .into(),
            None => main.into(),
        }
    }

    fn view_header(&self) -> Element<'_, Message> {
        let upload = button(text("Upload audio").size(14))
            .padding(Padding::new(8.0).left(18.0).right(18.0))
            .style(theme::primary_button)
            .on_press_maybe(self.core.engine.is_some().then_some(Message::PickFile));

        let track: Element<'_, Message> = match &self.view.track {
            Some(track) => column![
                text(track.name.clone()).size(18).style(primary_text),
                text(format!("{} · {}", track.tag, self.view.mode_label()))
                    .size(12)
                    .style(muted_text),
            ]
            .spacing(2)
            .into(),
            None => text("No track loaded").size(18).style(muted_text).into(),
        };

        let busy = text(self.view.busy.clone().unwrap_or_default())
            .size(13)
            .style(|theme| text::Style {
                color: Some(theme::info(theme)),
            });

        row![upload, track, Space::new().width(Fill), busy]
            .spacing(16)
            .align_y(Alignment::Center)
            .into()
    }

    fn view_waveform(&self) -> Element<'_, Message> {
        let overlay_on = self.view.overlay;
        let content = self
            .view
            .track
            .as_ref()
            .and_then(|track| {
                let primary = track.processed.waveform.as_ref()?;
                let overlay = track
                    .original
                    .waveform
                    .as_ref()
                    .filter(|_| overlay_on)
                    .map(|w| Series::new(&w.time, &w.data));
                Some(Chart::Waveform {
                    primary: Series::new(&primary.time, &primary.data),
                    overlay,
                    duration: self.view.duration,
                    playhead: self.view.scrub,
                })
            })
            .unwrap_or(Chart::Empty);

        chart_card("Waveform", None, chart(content, WAVEFORM_HEIGHT))
    }

    fn view_spectrum(&self) -> Element<'_, Message> {
        let (content, subtitle) = match (&self.view.live, &self.view.track) {
            (Some(live), _) if self.view.playing => (
                Chart::Spectrum {
                    primary: Series::new(&live.primary.frequencies, &live.primary.magnitude_db),
                    overlay: self
                        .view
                        .live_overlay()
                        .map(|f| Series::new(&f.frequencies, &f.magnitude_db)),
                    max_freq: Some(live.nyquist),
                },
                "Live",
            ),
            (_, Some(track)) => match track.processed.fft.as_ref() {
                Some(fft) => (
                    Chart::Spectrum {
                        primary: Series::new(&fft.frequencies, &fft.magnitude_db),
                        overlay: track
                            .original
                            .fft
                            .as_ref()
                            .filter(|_| self.view.overlay)
                            .map(|f| Series::new(&f.frequencies, &f.magnitude_db)),
                        max_freq: None,
                    },
                    "Whole track",
                ),
                None => (Chart::Empty, ""),
            },
            _ => (Chart::Empty, ""),
        };

        chart_card("Spectrum", Some(subtitle), chart(content, SPECTRUM_HEIGHT))
    }

    fn view_spectrogram(&self) -> Element<'_, Message> {
        let content = self
            .view
            .track
            .as_ref()
            .and_then(|track| track.processed.spectrogram.as_ref())
            .map(|matrix| Chart::Spectrogram {
                data: &matrix.data,
                times: &matrix.times,
                current_time: (self.view.playing || self.view.position > 0.0)
                    .then_some(self.view.position),
                cache: &self.view.spectrogram_cache,
            })
            .unwrap_or(Chart::Empty);

        chart_card("Spectrogram", None, chart(content, SPECTROGRAM_HEIGHT))
    }

    fn view_equalizer(&self) -> Element<'_, Message> {
        let gains = self.view.gains.values();
        let bands = row((0..BAND_COUNT).map(|band| {
            let gain = gains[band];
            column![
                text(format!("{:+.1}", gain)).size(10).style(muted_text),
                widgets::band_slider(gain, move |g| Message::BandChanged(band, g)).height(140),
                text(band_label(EQ_FREQUENCIES[band])).size(10).style(secondary_text),
            ]
            .spacing(4)
            .align_x(Alignment::Center)
            .width(Fill)
            .into()
        }))
        .spacing(2);

        let curve = match &self.view.curve {
            Some(curve) => Chart::EqCurve(Series::new(&curve.freqs_hz, &curve.mag_db)),
            None => Chart::Empty,
        };
        let curve_note = match &self.view.curve {
            Some(curve) if curve.local => "Response (local)",
            _ => "Response",
        };

        let toggles = column![
            toggler(self.view.overlay)
                .label("Original overlay")
                .text_size(12)
                .on_toggle(|_| Message::ToggleOverlay),
            toggler(self.view.auto_eq)
                .label("Auto EQ")
                .text_size(12)
                .on_toggle_maybe(self.view.track.is_some().then_some(|_: bool| Message::ToggleAutoEq)),
        ]
        .spacing(8);

        let status = match self.core.engine.as_ref().map(|e| e.phase()) {
            Some(CoordinatorPhase::PendingDebounce) => "Pending",
            Some(CoordinatorPhase::Applying) => "Applying",
            _ => "",
        };
        let reset = button(text("Flat").size(12))
            .padding(Padding::new(4.0).left(12.0).right(12.0))
            .style(theme::secondary_button)
            .on_press_maybe(
                (self.view.track.is_some() && !self.view.gains.is_flat())
                    .then_some(Message::ResetEq),
            );

        container(
            column![
                row![
                    section_title("Equalizer"),
                    Space::new().width(Fill),
                    text(status).size(11).style(muted_text),
                    reset,
                ]
                .spacing(8)
                .align_y(Alignment::Center),
                bands,
                text(curve_note).size(11).style(muted_text),
                container(chart(curve, CURVE_HEIGHT)).style(theme::chart_card),
                toggles,
            ]
            .spacing(10),
        )
        .padding(12)
        .width(Fill)
        .style(theme::panel)
        .into()
    }

    fn view_playlist(&self) -> Element<'_, Message> {
        let add = button(text("Add current").size(12))
            .padding(Padding::new(4.0).left(12.0).right(12.0))
            .style(theme::secondary_button)
            .on_press_maybe(self.view.track.is_some().then_some(Message::AddToPlaylist));

        let entries: Element<'_, Message> = if self.view.playlist.is_empty() {
            text("Saved tracks appear here").size(12).style(muted_text).into()
        } else {
            column(self.view.playlist.iter().map(|entry| {
                let active = self.view.active_entry.as_deref() == Some(entry.id.as_str());
                button(
                    column![
                        text(entry.display_name().to_string()).size(13),
                        text(entry.tag.clone()).size(10).style(muted_text),
                    ]
                    .spacing(2),
                )
                .width(Fill)
                .padding(8)
                .style(theme::list_item(active))
                .on_press(Message::LoadEntry(entry.id.clone()))
                .into()
            }))
            .spacing(4)
            .into()
        };

        container(
            column![
                row![section_title("Playlist"), Space::new().width(Fill), add]
                    .align_y(Alignment::Center),
                scrollable(entries).style(theme::dark_scrollable).height(Fill),
            ]
            .spacing(10),
        )
        .padding(12)
        .width(Fill)
        .height(Fill)
        .style(theme::panel)
        .into()
    }

    fn view_transport(&self) -> Element<'_, Message> {
        let has_track = self.view.track.is_some();
        let play = button(text(if self.view.playing { "Pause" } else { "Play" }).size(14))
            .padding(Padding::new(8.0).left(22.0).right(22.0))
            .style(theme::primary_button)
            .on_press_maybe(has_track.then_some(Message::TogglePlay));
        let stop = button(text("Stop").size(14))
            .padding(Padding::new(8.0).left(18.0).right(18.0))
            .style(theme::secondary_button)
            .on_press_maybe(has_track.then_some(Message::Stop));

        let fraction = self.view.scrub.unwrap_or_else(|| self.view.progress());
        let shown = match self.view.scrub {
            Some(f) => f * self.view.duration,
            None => self.view.position,
        };

        container(
            row![
                play,
                stop,
                text(format_time(shown)).size(12).style(secondary_text),
                widgets::seek_bar(fraction, Message::SeekPreview, Message::SeekRelease),
                text(format_time(self.view.duration)).size(12).style(secondary_text),
                text(self.core.settings.backend.base_url.clone()).size(10).style(muted_text),
            ]
            .spacing(12)
            .align_y(Alignment::Center),
        )
        .padding(12)
        .width(Fill)
        .style(theme::panel)
        .into()
    }
}

/// Dark card with a title row over a chart
fn chart_card<'a>(
    title: &'a str,
    subtitle: Option<&'a str>,
    content: Element<'a, Message>,
) -> Element<'a, Message> {
    let header = row![
        text(title).size(13).style(primary_text),
        Space::new().width(Fill),
        text(subtitle.unwrap_or_default()).size(11).style(muted_text),
    ];
    container(column![header, content].spacing(8))
        .padding(12)
        .width(Fill)
        .style(theme::chart_card)
        .into()
}

fn section_title<'a>(title: &'a str) -> Element<'a, Message> {
    text(title).size(14).style(primary_text).into()
}

fn primary_text(theme: &iced::Theme) -> text::Style {
    text::Style {
        color: Some(theme::text_primary(theme)),
    }
}

fn secondary_text(theme: &iced::Theme) -> text::Style {
    text::Style {
        color: Some(theme::text_secondary(theme)),
    }
}

fn muted_text(theme: &iced::Theme) -> text::Style {
    text::Style {
        color: Some(theme::text_muted(theme)),
    }
}
