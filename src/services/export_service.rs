use crate::error::Result;
use crate::models::ticket::{Priority, Ticket, TicketStatus};
use rust_xlsxwriter::*;
use std::collections::HashMap;
use uuid::Uuid;

pub struct ExportService;

impl ExportService {
    fn status_color(status: TicketStatus) -> Color {
        match status {
            TicketStatus::Open => Color::RGB(0x3B82F6),        // Blue
            TicketStatus::UnderReview => Color::RGB(0x8B5CF6), // Violet
            TicketStatus::InProgress => Color::RGB(0xF59E0B),  // Amber
            TicketStatus::Resolved => Color::RGB(0x10B981),    // Emerald
            TicketStatus::Closed => Color::RGB(0x64748B),      // Slate
        }
    }

    fn priority_color(priority: Priority) -> Color {
        match priority {
            Priority::Low => Color::RGB(0x64748B),
            Priority::Medium => Color::RGB(0x3B82F6),
            Priority::High => Color::RGB(0xF59E0B),
            Priority::Critical => Color::RGB(0xEF4444),
        }
    }

    fn label(status: TicketStatus) -> &'static str {
        match status {
            TicketStatus::Open => "Open",
            TicketStatus::UnderReview => "Under review",
            TicketStatus::InProgress => "In progress",
            TicketStatus::Resolved => "Resolved",
            TicketStatus::Closed => "Closed",
        }
    }
}

impl ExportService {
    /// Generate a styled XLSX workbook from a list of tickets.
    /// `user_names` resolves requester and assignee ids to display names.
    pub fn generate_tickets_xlsx(
        tickets: &[Ticket],
        user_names: &HashMap<Uuid, String>,
    ) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Tickets")?;

        // ── Color palette ──
        let primary_color = Color::RGB(0x1E293B); // Slate 800
        let header_bg = Color::RGB(0x0F172A); // Slate 900
        let header_text = Color::White;
        let alt_row_1 = Color::RGB(0xF8FAFC); // Slate 50
        let alt_row_2 = Color::White;
        let border_color = Color::RGB(0xE2E8F0); // Slate 200

        // ── Column definitions ──
        let columns = [
            ("Number", 14.0),
            ("Title", 40.0),
            ("Category", 16.0),
            ("Priority", 12.0),
            ("Status", 16.0),
            ("Requester", 24.0),
            ("Assignee", 24.0),
            ("Comments", 11.0),
            ("Rating", 10.0),
            ("Created", 18.0),
            ("Resolved", 18.0),
            ("Closed", 18.0),
        ];

        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }
        let last_col = (columns.len() - 1) as u16;

        // ── Title row ──
        let title_format = Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(header_text)
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);

        worksheet.set_row_height(0, 40)?;
        worksheet.merge_range(0, 0, 0, last_col, "Helpdesk ticket report", &title_format)?;

        // ── Subtitle row ──
        let subtitle_format = Format::new()
            .set_font_size(10)
            .set_italic()
            .set_font_color(Color::RGB(0x94A3B8))
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);

        worksheet.set_row_height(1, 22)?;
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
        let subtitle_text = format!("Exported: {}  •  Tickets: {}", now, tickets.len());
        worksheet.merge_range(1, 0, 1, last_col, &subtitle_text, &subtitle_format)?;

        // ── Header row ──
        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(header_text)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        let header_row = 2;
        worksheet.set_row_height(header_row, 30)?;
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_format)?;
        }

        let name_of = |id: Option<Uuid>| -> String {
            id.map(|id| user_names.get(&id).cloned().unwrap_or_else(|| id.to_string()))
                .unwrap_or_else(|| "—".to_string())
        };
        let date_of = |dt: Option<chrono::DateTime<chrono::Utc>>| -> String {
            dt.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "—".to_string())
        };

        // ── Data rows ──
        let data_start_row = 3;
        for (idx, ticket) in tickets.iter().enumerate() {
            let row = data_start_row + idx as u32;
            let bg = if idx % 2 == 0 { alt_row_1 } else { alt_row_2 };

            let base_fmt = Format::new()
                .set_font_size(10)
                .set_background_color(bg)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);
            let wrap_fmt = base_fmt.clone().set_text_wrap();
            let badge = |color: Color| {
                Format::new()
                    .set_font_size(10)
                    .set_bold()
                    .set_font_color(Color::White)
                    .set_background_color(color)
                    .set_align(FormatAlign::Center)
                    .set_align(FormatAlign::VerticalCenter)
                    .set_border(FormatBorder::Thin)
                    .set_border_color(border_color)
            };

            worksheet.set_row_height(row, 22)?;

            worksheet.write_string_with_format(row, 0, &ticket.ticket_number, &base_fmt.clone().set_bold())?;
            worksheet.write_string_with_format(row, 1, &ticket.title, &wrap_fmt)?;
            worksheet.write_string_with_format(row, 2, &ticket.category, &center_fmt)?;
            worksheet.write_string_with_format(
                row,
                3,
                ticket.priority.as_str(),
                &badge(Self::priority_color(ticket.priority)),
            )?;
            worksheet.write_string_with_format(
                row,
                4,
                Self::label(ticket.status),
                &badge(Self::status_color(ticket.status)),
            )?;
            worksheet.write_string_with_format(row, 5, &name_of(Some(ticket.created_by)), &base_fmt)?;
            worksheet.write_string_with_format(row, 6, &name_of(ticket.assigned_to), &base_fmt)?;
            worksheet.write_number_with_format(row, 7, ticket.comments.len() as f64, &center_fmt)?;

            match &ticket.rating {
                Some(rating) => {
                    worksheet.write_number_with_format(row, 8, rating.score as f64, &center_fmt)?;
                }
                None => {
                    worksheet.write_string_with_format(row, 8, "—", &center_fmt)?;
                }
            }

            worksheet.write_string_with_format(row, 9, &date_of(Some(ticket.created_at)), &center_fmt)?;
            worksheet.write_string_with_format(row, 10, &date_of(ticket.resolved_at), &center_fmt)?;
            worksheet.write_string_with_format(row, 11, &date_of(ticket.closed_at), &center_fmt)?;
        }

        // ── Summary row ──
        let total_row = data_start_row + tickets.len() as u32 + 1;
        let summary_fmt = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(primary_color)
            .set_background_color(Color::RGB(0xE0E7FF)) // Indigo 100
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        worksheet.set_row_height(total_row, 26)?;
        worksheet.merge_range(total_row, 0, total_row, 1, &format!("Total: {} tickets", tickets.len()), &summary_fmt)?;

        let status_summary = TicketStatus::ALL
            .iter()
            .map(|s| format!("{}: {}", Self::label(*s), tickets.iter().filter(|t| t.status == *s).count()))
            .collect::<Vec<_>>()
            .join(" | ");
        worksheet.merge_range(total_row, 2, total_row, 7, &status_summary, &summary_fmt)?;

        let scores: Vec<u8> = tickets.iter().filter_map(|t| t.rating.as_ref().map(|r| r.score)).collect();
        let rating_summary = if scores.is_empty() {
            "No ratings".to_string()
        } else {
            let avg = scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64;
            format!("Avg rating: {:.1} ({} rated)", avg, scores.len())
        };
        worksheet.merge_range(total_row, 8, total_row, last_col, &rating_summary, &summary_fmt)?;

        // Header stays visible while scrolling
        worksheet.set_freeze_panes(3, 0)?;
        worksheet.autofilter(2, 0, (data_start_row + tickets.len() as u32).saturating_sub(1).max(2), last_col)?;

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time;

    fn ticket(number: &str, status: TicketStatus) -> Ticket {
        let now = time::now();
        Ticket {
            id: Uuid::new_v4(),
            ticket_number: number.into(),
            title: "Printer jammed".into(),
            description: "Third floor".into(),
            category: "hardware".into(),
            priority: Priority::High,
            status,
            created_by: Uuid::new_v4(),
            assigned_to: None,
            comments: vec![],
            history: vec![],
            rating: None,
            resolved_at: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn produces_xlsx_archive() {
        let tickets = vec![
            ticket("TKT-000001", TicketStatus::Open),
            ticket("TKT-000002", TicketStatus::Resolved),
        ];
        let bytes = ExportService::generate_tickets_xlsx(&tickets, &HashMap::new()).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn empty_export_still_builds() {
        let bytes = ExportService::generate_tickets_xlsx(&[], &HashMap::new()).unwrap();
        assert!(!bytes.is_empty());
    }
}
